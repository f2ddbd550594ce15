//! The accumulator algebra: composable SQL-valued expression trees.
//!
//! An [`Accumulator`] is generic over its leaf representation. The compiler
//! builds `Accumulator<SymbolicElement>` trees, the resolver maps them to
//! `Accumulator<ResolvedElement>` with [`Accumulator::try_map`], and the
//! assembler renders the resolved trees. Operator precedence lives in the
//! tree shape; rendering decides where parentheses go.

use crate::error::Result;
use crate::expr::{AggregateFunction, BinaryOp, ScalarFunction};

/// Operators that wrap a single sub-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
    Aggregate(AggregateFunction),
    Function(ScalarFunction),
}

/// How an accumulator relates to aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationType {
    NotAggregated,
    ContainsAggregatedPart,
    IsAggregated,
}

/// Leaf behaviour the algebra needs to know about.
pub trait AccumulatorElement {
    /// Parameter leaves are aggregation-neutral: `COUNT(x) + 1` is aggregated.
    fn is_parameter(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator<E> {
    Leaf(E),
    Binary {
        op: BinaryOp,
        left: Box<Accumulator<E>>,
        right: Box<Accumulator<E>>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Accumulator<E>>,
    },
    Case {
        branches: Vec<(Accumulator<E>, Accumulator<E>)>,
        otherwise: Box<Accumulator<E>>,
    },
    SimpleCase {
        subject: Box<Accumulator<E>>,
        branches: Vec<(Accumulator<E>, Accumulator<E>)>,
        otherwise: Box<Accumulator<E>>,
    },
}

impl<E> Accumulator<E> {
    #[inline]
    pub const fn leaf(element: E) -> Self {
        Accumulator::Leaf(element)
    }

    /// `self op other`
    pub fn combine(self, op: BinaryOp, other: Accumulator<E>) -> Self {
        Accumulator::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `op(self)`
    pub fn wrap(self, op: UnaryOperator) -> Self {
        Accumulator::Unary {
            op,
            operand: Box::new(self),
        }
    }

    /// The leftmost leaf. Every tree has one.
    pub fn first(&self) -> &E {
        match self {
            Accumulator::Leaf(e) => e,
            Accumulator::Binary { left, .. } => left.first(),
            Accumulator::Unary { operand, .. } => operand.first(),
            Accumulator::Case { branches, otherwise } => branches
                .first()
                .map_or_else(|| otherwise.first(), |(when, _)| when.first()),
            Accumulator::SimpleCase { subject, .. } => subject.first(),
        }
    }

    /// True iff the tree is a single leaf.
    pub const fn has_one_item_only(&self) -> bool {
        matches!(self, Accumulator::Leaf(_))
    }

    /// All leaves, left to right.
    pub fn elements(&self) -> Vec<&E> {
        let mut out = Vec::new();
        self.visit(&mut |e, _| out.push(e));
        out
    }

    /// Visits every leaf with a flag telling whether it sits beneath an
    /// aggregate function.
    pub fn visit<'s>(&'s self, f: &mut impl FnMut(&'s E, bool)) {
        self.visit_inner(false, f);
    }

    fn visit_inner<'s>(&'s self, in_aggregate: bool, f: &mut impl FnMut(&'s E, bool)) {
        match self {
            Accumulator::Leaf(e) => f(e, in_aggregate),
            Accumulator::Binary { left, right, .. } => {
                left.visit_inner(in_aggregate, f);
                right.visit_inner(in_aggregate, f);
            }
            Accumulator::Unary { op, operand } => {
                let nested = in_aggregate || matches!(op, UnaryOperator::Aggregate(_));
                operand.visit_inner(nested, f);
            }
            Accumulator::Case { branches, otherwise } => {
                for (when, then) in branches {
                    when.visit_inner(in_aggregate, f);
                    then.visit_inner(in_aggregate, f);
                }
                otherwise.visit_inner(in_aggregate, f);
            }
            Accumulator::SimpleCase {
                subject,
                branches,
                otherwise,
            } => {
                subject.visit_inner(in_aggregate, f);
                for (when, then) in branches {
                    when.visit_inner(in_aggregate, f);
                    then.visit_inner(in_aggregate, f);
                }
                otherwise.visit_inner(in_aggregate, f);
            }
        }
    }

    /// Visits every aggregate node with its function and operand, outermost
    /// first.
    pub fn visit_aggregates<'s>(
        &'s self,
        f: &mut impl FnMut(AggregateFunction, &'s Accumulator<E>),
    ) {
        match self {
            Accumulator::Leaf(_) => {}
            Accumulator::Binary { left, right, .. } => {
                left.visit_aggregates(f);
                right.visit_aggregates(f);
            }
            Accumulator::Unary { op, operand } => {
                if let UnaryOperator::Aggregate(function) = op {
                    f(*function, operand);
                }
                operand.visit_aggregates(f);
            }
            Accumulator::Case { branches, otherwise } => {
                for (when, then) in branches {
                    when.visit_aggregates(f);
                    then.visit_aggregates(f);
                }
                otherwise.visit_aggregates(f);
            }
            Accumulator::SimpleCase {
                subject,
                branches,
                otherwise,
            } => {
                subject.visit_aggregates(f);
                for (when, then) in branches {
                    when.visit_aggregates(f);
                    then.visit_aggregates(f);
                }
                otherwise.visit_aggregates(f);
            }
        }
    }

    /// Total map over the leaves, preserving shape.
    pub fn try_map<U>(&self, f: &mut impl FnMut(&E) -> Result<U>) -> Result<Accumulator<U>> {
        Ok(match self {
            Accumulator::Leaf(e) => Accumulator::Leaf(f(e)?),
            Accumulator::Binary { op, left, right } => Accumulator::Binary {
                op: *op,
                left: Box::new(left.try_map(f)?),
                right: Box::new(right.try_map(f)?),
            },
            Accumulator::Unary { op, operand } => Accumulator::Unary {
                op: *op,
                operand: Box::new(operand.try_map(f)?),
            },
            Accumulator::Case { branches, otherwise } => Accumulator::Case {
                branches: map_branches(branches, f)?,
                otherwise: Box::new(otherwise.try_map(f)?),
            },
            Accumulator::SimpleCase {
                subject,
                branches,
                otherwise,
            } => Accumulator::SimpleCase {
                subject: Box::new(subject.try_map(f)?),
                branches: map_branches(branches, f)?,
                otherwise: Box::new(otherwise.try_map(f)?),
            },
        })
    }
}

fn map_branches<E, U>(
    branches: &[(Accumulator<E>, Accumulator<E>)],
    f: &mut impl FnMut(&E) -> Result<U>,
) -> Result<Vec<(Accumulator<U>, Accumulator<U>)>> {
    branches
        .iter()
        .map(|(when, then)| Ok((when.try_map(f)?, then.try_map(f)?)))
        .collect()
}

impl<E: AccumulatorElement> Accumulator<E> {
    /// Computed bottom-up; parameter-only sub-trees do not participate.
    pub fn aggregation_type(&self) -> AggregationType {
        self.aggregation().unwrap_or(AggregationType::NotAggregated)
    }

    fn aggregation(&self) -> Option<AggregationType> {
        match self {
            Accumulator::Leaf(e) if e.is_parameter() => None,
            Accumulator::Leaf(_) => Some(AggregationType::NotAggregated),
            Accumulator::Unary {
                op: UnaryOperator::Aggregate(_),
                ..
            } => Some(AggregationType::IsAggregated),
            Accumulator::Unary { operand, .. } => operand.aggregation(),
            Accumulator::Binary { left, right, .. } => {
                merge([left.aggregation(), right.aggregation()])
            }
            Accumulator::Case { branches, otherwise } => merge(
                branches
                    .iter()
                    .flat_map(|(w, t)| [w.aggregation(), t.aggregation()])
                    .chain([otherwise.aggregation()]),
            ),
            Accumulator::SimpleCase {
                subject,
                branches,
                otherwise,
            } => merge(
                [subject.aggregation()]
                    .into_iter()
                    .chain(
                        branches
                            .iter()
                            .flat_map(|(w, t)| [w.aggregation(), t.aggregation()]),
                    )
                    .chain([otherwise.aggregation()]),
            ),
        }
    }
}

fn merge(parts: impl IntoIterator<Item = Option<AggregationType>>) -> Option<AggregationType> {
    parts.into_iter().flatten().reduce(|a, b| match (a, b) {
        (AggregationType::IsAggregated, AggregationType::IsAggregated) => {
            AggregationType::IsAggregated
        }
        (AggregationType::NotAggregated, AggregationType::NotAggregated) => {
            AggregationType::NotAggregated
        }
        _ => AggregationType::ContainsAggregatedPart,
    })
}
