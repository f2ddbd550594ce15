//! CASE expressions.
//!
//! ```
//! use rowshape_core::expr::Expr;
//!
//! let age = Expr::row().field("age");
//! let label = Expr::case()
//!     .when(age.clone().gt(Expr::lit(65)), Expr::lit("Senior"))
//!     .when(age.gt(Expr::lit(18)), Expr::lit("Adult"))
//!     .otherwise(Expr::lit("Minor"));
//! assert!(label.to_string().starts_with("case when"));
//! ```

use core::fmt;

use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub enum CaseExpr {
    /// `CASE WHEN cond THEN result ... ELSE otherwise END`
    Searched {
        branches: Vec<(Expr, Expr)>,
        otherwise: Box<Expr>,
    },
    /// `CASE subject WHEN value THEN result ... ELSE otherwise END`
    Simple {
        subject: Box<Expr>,
        branches: Vec<(Expr, Expr)>,
        otherwise: Box<Expr>,
    },
}

impl CaseExpr {
    pub(crate) fn sub_expressions(&self) -> impl Iterator<Item = &Expr> {
        let (subject, branches, otherwise) = match self {
            CaseExpr::Searched {
                branches,
                otherwise,
            } => (None, branches, otherwise),
            CaseExpr::Simple {
                subject,
                branches,
                otherwise,
            } => (Some(subject.as_ref()), branches, otherwise),
        };
        subject
            .into_iter()
            .chain(branches.iter().flat_map(|(w, t)| [w, t]))
            .chain(core::iter::once(otherwise.as_ref()))
    }
}

impl fmt::Display for CaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (branches, otherwise) = match self {
            CaseExpr::Searched {
                branches,
                otherwise,
            } => {
                f.write_str("case")?;
                (branches, otherwise)
            }
            CaseExpr::Simple {
                subject,
                branches,
                otherwise,
            } => {
                write!(f, "case {subject}")?;
                (branches, otherwise)
            }
        };
        for (when, then) in branches {
            write!(f, " when {when} then {then}")?;
        }
        write!(f, " else {otherwise} end")
    }
}

/// Builder for a searched CASE. `otherwise` is mandatory to finish.
#[derive(Debug, Clone, Default)]
pub struct CaseBuilder {
    branches: Vec<(Expr, Expr)>,
}

impl CaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, condition: Expr, result: Expr) -> Self {
        self.branches.push((condition, result));
        self
    }

    pub fn otherwise(self, result: Expr) -> Expr {
        Expr::Case(CaseExpr::Searched {
            branches: self.branches,
            otherwise: Box::new(result),
        })
    }
}

/// Builder for a simple CASE over a subject.
#[derive(Debug, Clone)]
pub struct SimpleCaseBuilder {
    subject: Expr,
    branches: Vec<(Expr, Expr)>,
}

impl SimpleCaseBuilder {
    pub fn new(subject: Expr) -> Self {
        Self {
            subject,
            branches: Vec::new(),
        }
    }

    pub fn when(mut self, value: Expr, result: Expr) -> Self {
        self.branches.push((value, result));
        self
    }

    pub fn otherwise(self, result: Expr) -> Expr {
        Expr::Case(CaseExpr::Simple {
            subject: Box::new(self.subject),
            branches: self.branches,
            otherwise: Box::new(result),
        })
    }
}
