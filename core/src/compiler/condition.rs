use super::{Compiled, Compiler, MappedTable, Scope};
use crate::accumulator::Accumulator;
use crate::element::SymbolicElement;
use crate::error::{Result, RowshapeError};
use crate::expr::{BinaryOp, CaseExpr, Expr};
use crate::value::{Value, ValueType};

type Branches = Vec<(Accumulator<SymbolicElement>, Accumulator<SymbolicElement>)>;

impl Compiler<'_> {
    /// `value IN set`. The set must be made of parameters: either an array
    /// literal of row-independent items or a single list-valued expression.
    pub(super) fn membership(
        &mut self,
        expr: &Expr,
        value: &Expr,
        set: &Expr,
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let mut tables = Vec::new();
        let (subject, _) = self.operand(expr, value, scope, &mut tables)?;

        let list = match set {
            Expr::Array(items) if items.is_empty() => {
                self.expanded_parameter(Value::List(Vec::new()))
            }
            Expr::Array(items) => {
                let mut list: Option<Accumulator<SymbolicElement>> = None;
                for item in items {
                    if item.depends_on_row() {
                        return Err(RowshapeError::MembershipOperand {
                            expr: item.to_string(),
                        });
                    }
                    let (id, _) = self.register_parameter(item)?;
                    let leaf = Accumulator::leaf(SymbolicElement::Parameter(id));
                    list = Some(match list {
                        None => leaf,
                        Some(list) => list.combine(BinaryOp::Comma, leaf),
                    });
                }
                list.ok_or_else(|| RowshapeError::invariant("non-empty array produced no items"))?
            }
            other if other.depends_on_row() => {
                return Err(RowshapeError::MembershipOperand {
                    expr: other.to_string(),
                });
            }
            other => {
                let (id, _) = self.register_parameter(other)?;
                self.params.mark_expanded(id);
                Accumulator::leaf(SymbolicElement::Parameter(id))
            }
        };

        Ok(
            Compiled::value(subject.combine(BinaryOp::In, list), ValueType::Bool)
                .with_tables(tables),
        )
    }

    fn expanded_parameter(&mut self, value: Value) -> Accumulator<SymbolicElement> {
        let id = self.params.register_value(value);
        self.params.mark_expanded(id);
        Accumulator::leaf(SymbolicElement::Parameter(id))
    }

    /// `a ? b : (c ? d : e)` flattens into one searched CASE.
    pub(super) fn conditional(&mut self, expr: &Expr, scope: Scope<'_>) -> Result<Compiled> {
        let mut tables = Vec::new();
        let mut branches = Branches::new();
        let mut ty = None;
        let mut current = expr;
        while let Expr::Conditional {
            test,
            if_true,
            if_false,
        } = current
        {
            let (when, _) = self.operand(expr, test, scope, &mut tables)?;
            let (then, then_ty) = self.operand(expr, if_true, scope, &mut tables)?;
            ty.get_or_insert(then_ty);
            branches.push((when, then));
            current = if_false;
        }
        let (otherwise, _) = self.operand(expr, current, scope, &mut tables)?;
        Ok(Compiled::value(
            Accumulator::Case {
                branches,
                otherwise: Box::new(otherwise),
            },
            ty.unwrap_or_default(),
        )
        .with_tables(tables))
    }

    pub(super) fn case(&mut self, expr: &Expr, case: &CaseExpr, scope: Scope<'_>) -> Result<Compiled> {
        let mut tables = Vec::new();
        let (subject, branches, otherwise) = match case {
            CaseExpr::Searched {
                branches,
                otherwise,
            } => (None, branches, otherwise),
            CaseExpr::Simple {
                subject,
                branches,
                otherwise,
            } => (Some(subject), branches, otherwise),
        };
        let subject = subject
            .map(|s| self.operand(expr, s, scope, &mut tables).map(|(acc, _)| acc))
            .transpose()?;

        let (compiled, ty) = self.branches(expr, branches, scope, &mut tables)?;
        let (otherwise, otherwise_ty) = self.operand(expr, otherwise, scope, &mut tables)?;
        let ty = ty.unwrap_or(otherwise_ty);
        let accumulator = match subject {
            None => Accumulator::Case {
                branches: compiled,
                otherwise: Box::new(otherwise),
            },
            Some(subject) => Accumulator::SimpleCase {
                subject: Box::new(subject),
                branches: compiled,
                otherwise: Box::new(otherwise),
            },
        };
        Ok(Compiled::value(accumulator, ty).with_tables(tables))
    }

    fn branches(
        &mut self,
        expr: &Expr,
        branches: &[(Expr, Expr)],
        scope: Scope<'_>,
        tables: &mut Vec<MappedTable>,
    ) -> Result<(Branches, Option<ValueType>)> {
        let mut out = Branches::with_capacity(branches.len());
        let mut ty = None;
        for (when, then) in branches {
            let (when, _) = self.operand(expr, when, scope, tables)?;
            let (then, then_ty) = self.operand(expr, then, scope, tables)?;
            ty.get_or_insert(then_ty);
            out.push((when, then));
        }
        Ok((out, ty))
    }
}
