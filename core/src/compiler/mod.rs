//! Mapping compiler: translates a mapping expression into accumulators and
//! mapped tables over a statement catalog.
//!
//! Every rule compiles its children through [`ResultExt::within`], so a
//! failure deep inside a mapping surfaces with one breadcrumb per enclosing
//! expression.

mod call;
mod condition;
mod construct;
mod context;
mod mapped;

use crate::accumulator::{Accumulator, AggregationType, UnaryOperator};
use crate::element::{Binding, ParamRoot, PropertyPath, SymbolicElement};
use crate::error::{Result, ResultExt, RowshapeError};
use crate::expr::{BinaryOp, Call, Expr, ParamRef, UnaryOp, eval};
use crate::params::{ParamId, ParamPool};
use crate::schema::Cardinality;
use crate::statement::{Lookup, Statement, TableId};
use crate::target::{Segment, TargetPath};
use crate::value::ValueType;

pub(crate) use context::{Compiler, Env, Frame, Scope};
pub use mapped::{Compiled, MappedProperty, MappedTable};

/// The compiled projection of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMapping {
    pub properties: Vec<MappedProperty>,
    pub tables: Vec<MappedTable>,
    pub bindings: Vec<Binding>,
}

/// A compiled join condition, filter or ordering key.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    pub accumulator: Accumulator<SymbolicElement>,
    pub bindings: Vec<Binding>,
}

/// Compiles a projection. The mapping may produce a scalar, an object, a
/// whole table or the whole query shape.
pub fn compile_mapping(
    expr: &Expr,
    statement: &Statement,
    params: &mut ParamPool,
) -> Result<CompiledMapping> {
    let mut compiler = Compiler::new(statement, params);
    let compiled = compiler.compile_value(expr, Scope::root(statement.primary().id))?;
    Ok(CompiledMapping {
        properties: compiled.properties,
        tables: compiled.tables,
        bindings: compiler.bindings,
    })
}

/// Compiles an expression that must produce one row-level value.
pub fn compile_condition(
    expr: &Expr,
    statement: &Statement,
    params: &mut ParamPool,
) -> Result<CompiledCondition> {
    let mut compiler = Compiler::new(statement, params);
    let mut tables = Vec::new();
    let compiled = compiler.compile(expr, Scope::root(statement.primary().id))?;
    let (accumulator, _) = compiler.into_operand(expr, compiled, &mut tables)?;
    if accumulator.aggregation_type() != AggregationType::NotAggregated {
        return Err(RowshapeError::unsupported(
            expr,
            "aggregates cannot be used in join conditions, filters or orderings",
        ));
    }
    Ok(CompiledCondition {
        accumulator,
        bindings: compiler.bindings,
    })
}

/// A reference to something bigger than a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Whole {
    Shape,
    Table(TableId),
}

/// Row-independent expressions that become a single bound parameter.
/// Constructions stay structural and collection methods keep their own rules.
fn is_constant_like(expr: &Expr) -> bool {
    let structural = matches!(
        expr,
        Expr::MemberInit(_)
            | Expr::Construct(_)
            | Expr::Array(_)
            | Expr::Call(
                Call::Aggregate { .. }
                    | Call::Select { .. }
                    | Call::ToList(_)
                    | Call::One(_)
                    | Call::RowNumber
                    | Call::Method { .. }
            )
    );
    !structural && !expr.depends_on_row()
}

impl Compiler<'_> {
    pub(crate) fn compile(&mut self, expr: &Expr, scope: Scope<'_>) -> Result<Compiled> {
        if is_constant_like(expr) {
            return self.parameter(expr);
        }
        match expr {
            Expr::Param(ParamRef::Row) => Ok(Compiled::value(
                Accumulator::leaf(SymbolicElement::column(ParamRoot::Row, PropertyPath::new())),
                ValueType::Any,
            )),
            Expr::Param(ParamRef::Var(name)) => {
                let root = ParamRoot::Binding(Self::binding_for(&scope, name)?);
                Ok(Compiled::value(
                    Accumulator::leaf(SymbolicElement::column(root, PropertyPath::new())),
                    self.type_of(root, &[])?,
                ))
            }
            Expr::Param(ParamRef::Args) | Expr::Constant(_) => self.parameter(expr),
            Expr::Member { object, name } => self.member(expr, object, name, scope),
            Expr::Unary { op, operand } => {
                let mut tables = Vec::new();
                let (operand, ty) = self.operand(expr, operand, scope, &mut tables)?;
                let (op, ty) = match op {
                    UnaryOp::Not => (UnaryOperator::Not, ValueType::Bool),
                    UnaryOp::Negate => (UnaryOperator::Negate, ty),
                };
                Ok(Compiled::value(operand.wrap(op), ty).with_tables(tables))
            }
            Expr::Binary {
                op: BinaryOp::In,
                left,
                right,
            } => self.membership(expr, left, right, scope),
            Expr::Binary {
                op: BinaryOp::Comma,
                ..
            } => Err(RowshapeError::unsupported(
                expr,
                "list separators only appear inside membership tests",
            )),
            Expr::Binary { op, left, right } => {
                let mut tables = Vec::new();
                let (left, left_ty) = self.operand(expr, left, scope, &mut tables)?;
                let (right, right_ty) = self.operand(expr, right, scope, &mut tables)?;
                let ty = if op.is_boolean() {
                    ValueType::Bool
                } else {
                    left_ty.widen(right_ty)
                };
                Ok(Compiled::value(left.combine(*op, right), ty).with_tables(tables))
            }
            Expr::Construct(items) | Expr::Array(items) => self.construct(expr, items, scope),
            Expr::MemberInit(members) => self.member_init(expr, members, scope),
            Expr::Conditional { .. } => self.conditional(expr, scope),
            Expr::Case(case) => self.case(expr, case, scope),
            Expr::Call(call) => self.call(expr, call, scope),
        }
    }

    /// Compiles `expr` where a whole table or the whole shape expands into
    /// its members.
    pub(crate) fn compile_value(&mut self, expr: &Expr, scope: Scope<'_>) -> Result<Compiled> {
        let compiled = self.compile(expr, scope)?;
        let Some(whole) = self.whole(&compiled)? else {
            return Ok(compiled);
        };
        let statement = self.statement;
        let expanded = match whole {
            Whole::Shape => {
                let members = statement
                    .shape_members()
                    .into_iter()
                    .map(|member| (member, expr.field(member)));
                self.compile_value(&Expr::object(members), scope)?
            }
            Whole::Table(id) => {
                let table = statement.table(id);
                if id == scope.table || table.cardinality == Cardinality::One {
                    let fields = table
                        .schema
                        .columns
                        .iter()
                        .map(|c| (c.field.clone(), expr.field(c.field.clone())));
                    let mut object = self.compile(&Expr::object(fields), scope)?;
                    if id != scope.table {
                        object.tables.push(MappedTable {
                            table: id,
                            target: TargetPath::root(),
                            aggregated: scope.in_aggregate,
                            single: true,
                        });
                    }
                    object
                } else {
                    let var = self.fresh_name();
                    self.compile(&expr.select(var, |v| v), scope)?
                }
            }
        };
        Ok(expanded.with_tables(compiled.tables))
    }

    /// Classifies a compiled plain member chain.
    pub(crate) fn whole(&self, compiled: &Compiled) -> Result<Option<Whole>> {
        let Some(property) = compiled.as_single() else {
            return Ok(None);
        };
        let Accumulator::Leaf(SymbolicElement::Column {
            root,
            path,
            aggregation_table: None,
            function: None,
        }) = &property.accumulator
        else {
            return Ok(None);
        };
        Ok(match self.lookup(*root, path)? {
            Some(Lookup::Shape) => Some(Whole::Shape),
            Some(Lookup::Table(table)) => Some(Whole::Table(table.id)),
            _ => None,
        })
    }

    /// Compiles `child` of `parent` into exactly one scalar value, collecting
    /// any mapped tables it reports.
    pub(crate) fn operand(
        &mut self,
        parent: &Expr,
        child: &Expr,
        scope: Scope<'_>,
        tables: &mut Vec<MappedTable>,
    ) -> Result<(Accumulator<SymbolicElement>, ValueType)> {
        let compiled = self.compile(child, scope).within(parent)?;
        self.into_operand(child, compiled, tables).within(parent)
    }

    pub(crate) fn into_operand(
        &self,
        expr: &Expr,
        compiled: Compiled,
        tables: &mut Vec<MappedTable>,
    ) -> Result<(Accumulator<SymbolicElement>, ValueType)> {
        match self.whole(&compiled)? {
            Some(Whole::Shape) => {
                return Err(RowshapeError::unsupported(
                    expr,
                    "the query shape cannot be used as a value",
                ));
            }
            Some(Whole::Table(_)) => {
                return Err(RowshapeError::unsupported(
                    expr,
                    "a whole table cannot be used as a scalar; pick one of its fields",
                ));
            }
            None => {}
        }
        let Compiled {
            mut properties,
            tables: reported,
        } = compiled;
        match properties.pop() {
            Some(property) if properties.is_empty() && property.target.is_root() => {
                tables.extend(reported);
                Ok((property.accumulator, property.ty))
            }
            _ => Err(RowshapeError::unsupported(
                expr,
                "an object or collection cannot be used as a scalar",
            )),
        }
    }

    pub(crate) fn parameter(&mut self, expr: &Expr) -> Result<Compiled> {
        let (id, ty) = self.register_parameter(expr)?;
        Ok(Compiled::value(Accumulator::leaf(SymbolicElement::Parameter(id)), ty))
    }

    /// Folds constants now; argument-dependent expressions are evaluated per
    /// execution.
    pub(crate) fn register_parameter(&mut self, expr: &Expr) -> Result<(ParamId, ValueType)> {
        if expr.depends_on_args() {
            return Ok((self.params.register_deferred(expr.clone()), ValueType::Any));
        }
        let value = eval::evaluate(expr, &serde_json::Value::Null).within(expr)?;
        let ty = value.value_type();
        Ok((self.params.register_value(value), ty))
    }

    fn member(
        &mut self,
        expr: &Expr,
        object: &Expr,
        name: &str,
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let compiled = self.compile(object, scope).within(expr)?;

        if let Some(property) = compiled.as_single()
            && let Accumulator::Leaf(SymbolicElement::Column {
                root,
                path,
                aggregation_table: None,
                function: None,
            }) = &property.accumulator
        {
            let mut path = path.clone();
            path.push(name.into());
            let root = *root;
            let ty = self.type_of(root, &path)?;
            return Ok(Compiled::value(
                Accumulator::leaf(SymbolicElement::column(root, path)),
                ty,
            )
            .with_tables(compiled.tables));
        }

        let member = compiled.member(&Segment::Field(name.into()));
        if member.properties.is_empty() {
            return Err(RowshapeError::unsupported(
                expr,
                format!("`{object}` has no member `{name}`"),
            ));
        }
        Ok(member)
    }
}
