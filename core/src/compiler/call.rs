use compact_str::CompactString;

use super::{Compiled, Compiler, Env, Frame, MappedProperty, MappedTable, Scope, Whole};
use crate::accumulator::{Accumulator, UnaryOperator};
use crate::element::{ParamRoot, PropertyPath, SymbolicElement};
use crate::error::{Result, ResultExt, RowshapeError};
use crate::expr::{AggregateFunction, Call, Expr, Lambda, ScalarFunction};
use crate::schema::Cardinality;
use crate::statement::Lookup;
use crate::syntax::ROW_ID;
use crate::target::TargetPath;
use crate::value::ValueType;

impl Compiler<'_> {
    pub(super) fn call(&mut self, expr: &Expr, call: &Call, scope: Scope<'_>) -> Result<Compiled> {
        match call {
            Call::Aggregate { function, source } => self.aggregate(expr, *function, source, scope),
            Call::Scalar { function, operand } => self.scalar(expr, *function, operand, scope),
            Call::Select { source, lambda } => self.select(expr, source, lambda, scope),
            Call::ToList(source) => self.compile_value(source, scope).within(expr),
            Call::One(source) => self.one(expr, source, scope),
            Call::RowNumber => {
                let table = self.statement.table(scope.table);
                let mut path = PropertyPath::new();
                if !table.path.is_empty() {
                    path.push(table.path.clone());
                }
                path.push(CompactString::const_new(ROW_ID));
                Ok(Compiled::value(
                    Accumulator::leaf(SymbolicElement::column(ParamRoot::Row, path)),
                    ValueType::Integer,
                ))
            }
            Call::In { value, set } | Call::Contains { set, value } => {
                self.membership(expr, value, set, scope)
            }
            Call::Method { name, .. } => Err(RowshapeError::unsupported(
                expr,
                format!("method `{name}` has no SQL translation"),
            )),
        }
    }

    fn aggregate(
        &mut self,
        expr: &Expr,
        function: AggregateFunction,
        source: &Expr,
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let inner = Scope {
            in_aggregate: true,
            ..scope
        };
        let compiled = self.compile(source, inner).within(expr)?;
        let whole = self.whole(&compiled)?;
        let Compiled {
            mut properties,
            mut tables,
        } = compiled;
        let property = match properties.pop() {
            Some(property) if properties.is_empty() && property.target.is_root() => property,
            _ => {
                return Err(RowshapeError::unsupported(
                    expr,
                    "aggregates need a source producing a single value per element",
                ));
            }
        };

        let MappedProperty {
            mut accumulator,
            mut ty,
            ..
        } = property;
        match whole {
            Some(Whole::Table(id)) => {
                if function != AggregateFunction::Count {
                    return Err(RowshapeError::unsupported(
                        expr,
                        format!(
                            "`{}` needs a field of `{}`; only count() applies to a whole table",
                            function.method_name(),
                            self.statement.table(id).schema.name
                        ),
                    ));
                }
                if let Accumulator::Leaf(SymbolicElement::Column { path, .. }) = &mut accumulator {
                    path.push(CompactString::const_new(ROW_ID));
                }
                tables.push(MappedTable {
                    table: id,
                    target: TargetPath::root(),
                    aggregated: true,
                    single: false,
                });
            }
            Some(Whole::Shape) => {
                return Err(RowshapeError::unsupported(
                    expr,
                    "the query shape cannot be aggregated",
                ));
            }
            None => {}
        }

        let accumulator = accumulator.try_map(&mut |element| {
            Ok(match element {
                SymbolicElement::Column {
                    root,
                    path,
                    aggregation_table: None,
                    function,
                } => SymbolicElement::Column {
                    root: *root,
                    path: path.clone(),
                    aggregation_table: Some(scope.table),
                    function: *function,
                },
                other => other.clone(),
            })
        })?;
        for table in &mut tables {
            table.aggregated = true;
        }

        ty = match function {
            AggregateFunction::Count => ValueType::Integer,
            AggregateFunction::Avg => ValueType::Real,
            _ => ty,
        };
        Ok(
            Compiled::value(accumulator.wrap(UnaryOperator::Aggregate(function)), ty)
                .with_tables(tables),
        )
    }

    fn scalar(
        &mut self,
        expr: &Expr,
        function: ScalarFunction,
        operand: &Expr,
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let mut tables = Vec::new();
        let (accumulator, ty) = self.operand(expr, operand, scope, &mut tables)?;
        let accumulator = match accumulator {
            Accumulator::Leaf(SymbolicElement::Column {
                root,
                path,
                aggregation_table,
                function: None,
            }) => Accumulator::leaf(SymbolicElement::Column {
                root,
                path,
                aggregation_table,
                function: Some(function),
            }),
            other => other.wrap(UnaryOperator::Function(function)),
        };
        let ty = match function {
            ScalarFunction::Upper | ScalarFunction::Lower => ValueType::Text,
            ScalarFunction::Length => ValueType::Integer,
            ScalarFunction::Abs => ty,
        };
        Ok(Compiled::value(accumulator, ty).with_tables(tables))
    }

    fn select(
        &mut self,
        expr: &Expr,
        source: &Expr,
        lambda: &Lambda,
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let compiled = self.compile(source, scope).within(expr)?;
        let Compiled {
            mut properties,
            tables: mut out,
        } = compiled;
        let (root, path) = match properties.pop() {
            Some(MappedProperty {
                accumulator:
                    Accumulator::Leaf(SymbolicElement::Column {
                        root,
                        path,
                        aggregation_table: None,
                        function: None,
                    }),
                target,
                ..
            }) if properties.is_empty() && target.is_root() => (root, path),
            _ => {
                return Err(RowshapeError::unsupported(
                    expr,
                    "select() applies to a table or a plain member chain",
                ));
            }
        };

        let table = match self.lookup(root, &path)? {
            Some(Lookup::Table(table)) => Some((table.id, table.cardinality == Cardinality::One)),
            Some(Lookup::Shape) => {
                return Err(RowshapeError::unsupported(
                    expr,
                    "select() over the whole query shape; select one of its tables",
                ));
            }
            _ => None,
        };

        let binding = self.bind(root, path);
        let frame = Frame {
            name: lambda.param.as_str(),
            binding,
            parent: scope.env,
        };
        let inner = Scope {
            env: Env::with(&frame),
            table: table.map_or(scope.table, |(id, _)| id),
            in_aggregate: scope.in_aggregate,
        };
        let body = self.compile_value(&lambda.body, inner).within(expr)?;

        if let Some((id, single)) = table {
            out.push(MappedTable {
                table: id,
                target: TargetPath::root(),
                aggregated: scope.in_aggregate,
                single,
            });
        }
        out.extend(body.tables);
        Ok(Compiled {
            properties: body.properties,
            tables: out,
        })
    }

    fn one(&mut self, expr: &Expr, source: &Expr, scope: Scope<'_>) -> Result<Compiled> {
        let mut compiled = self.compile_value(source, scope).within(expr)?;
        let mut marked = false;
        for table in &mut compiled.tables {
            if table.target.is_root() && !table.aggregated {
                table.single = true;
                marked = true;
            }
        }
        if !marked {
            return Err(RowshapeError::unsupported(
                expr,
                "one() applies to a collection of table rows",
            ));
        }
        Ok(compiled)
    }
}
