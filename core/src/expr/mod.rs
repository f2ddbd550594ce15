//! The mapping language: an owned AST over the joined query shape.
//!
//! Mappings are ordinary values built with the constructors and combinators
//! below, then handed to the compiler.
//!
//! ```
//! use rowshape_core::expr::Expr;
//!
//! let q = Expr::row();
//! let mapping = Expr::object([
//!     ("name", q.field("person").field("name")),
//!     ("count", q.field("classes").count()),
//! ]);
//! assert_eq!(
//!     mapping.to_string(),
//!     "{ name: q.person.name, count: q.classes.count() }"
//! );
//! ```

mod case;
pub(crate) mod eval;
mod ops;

use core::fmt;

use compact_str::CompactString;

use crate::value::Value;

pub use case::{CaseBuilder, CaseExpr, SimpleCaseBuilder};
pub use ops::{AggregateFunction, BinaryOp, ScalarFunction, UnaryOp};

/// A lambda parameter reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamRef {
    /// The query shape row (`q`)
    Row,
    /// The external arguments object supplied at execution time
    Args,
    /// A parameter introduced by an enclosing `select`
    Var(CompactString),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub param: CompactString,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Param(ParamRef),
    Constant(Value),
    Member {
        object: Box<Expr>,
        name: CompactString,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Positional construction (a tuple or constructor call)
    Construct(Vec<Expr>),
    /// In-place array/list construction
    Array(Vec<Expr>),
    /// Named member initialization
    MemberInit(Vec<(CompactString, Expr)>),
    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Case(CaseExpr),
    Call(Call),
}

/// Method calls. Everything except `Method` is recognized by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Aggregate {
        function: AggregateFunction,
        source: Box<Expr>,
    },
    Scalar {
        function: ScalarFunction,
        operand: Box<Expr>,
    },
    Select {
        source: Box<Expr>,
        lambda: Lambda,
    },
    /// Collection-materializing no-op (`to_list`, `to_array`)
    ToList(Box<Expr>),
    /// Asserts the source yields exactly one element per parent
    One(Box<Expr>),
    /// Row number of the current mapping context's table
    RowNumber,
    /// `value.is_in(set)`
    In { value: Box<Expr>, set: Box<Expr> },
    /// `set.contains(value)`
    Contains { set: Box<Expr>, value: Box<Expr> },
    /// Any other method; always rejected by the compiler
    Method {
        name: CompactString,
        receiver: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    // ==================== leaves ====================

    /// The query shape parameter.
    pub const fn row() -> Expr {
        Expr::Param(ParamRef::Row)
    }

    /// The external arguments parameter.
    pub const fn args() -> Expr {
        Expr::Param(ParamRef::Args)
    }

    pub fn var(name: impl Into<CompactString>) -> Expr {
        Expr::Param(ParamRef::Var(name.into()))
    }

    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Constant(value.into())
    }

    pub fn row_number() -> Expr {
        Expr::Call(Call::RowNumber)
    }

    // ==================== construction ====================

    pub fn object<N, I>(members: I) -> Expr
    where
        N: Into<CompactString>,
        I: IntoIterator<Item = (N, Expr)>,
    {
        Expr::MemberInit(members.into_iter().map(|(n, e)| (n.into(), e)).collect())
    }

    pub fn tuple(args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Construct(args.into_iter().collect())
    }

    pub fn array(items: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Array(items.into_iter().collect())
    }

    pub fn cond(test: Expr, if_true: Expr, if_false: Expr) -> Expr {
        Expr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    /// Starts a searched `CASE WHEN ... THEN ... ELSE ... END`.
    pub fn case() -> CaseBuilder {
        CaseBuilder::new()
    }

    /// Starts a simple `CASE subject WHEN value THEN ... ELSE ... END`.
    pub fn case_of(subject: Expr) -> SimpleCaseBuilder {
        SimpleCaseBuilder::new(subject)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    // ==================== member access ====================

    pub fn field(&self, name: impl Into<CompactString>) -> Expr {
        Expr::Member {
            object: Box::new(self.clone()),
            name: name.into(),
        }
    }

    // ==================== comparisons & logic ====================

    pub fn eq(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Equal, self, other)
    }

    pub fn ne(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::NotEqual, self, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Less, self, other)
    }

    pub fn le(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::LessOrEqual, self, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Greater, self, other)
    }

    pub fn ge(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::GreaterOrEqual, self, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Or, self, other)
    }

    pub fn is_in(self, set: Expr) -> Expr {
        Expr::Call(Call::In {
            value: Box::new(self),
            set: Box::new(set),
        })
    }

    pub fn contains(self, value: Expr) -> Expr {
        Expr::Call(Call::Contains {
            set: Box::new(self),
            value: Box::new(value),
        })
    }

    // ==================== collection methods ====================

    /// Projects every element through `body`, whose argument is `name`.
    pub fn select(&self, name: impl Into<CompactString>, body: impl FnOnce(Expr) -> Expr) -> Expr {
        let name = name.into();
        let body = body(Expr::var(name.clone()));
        Expr::Call(Call::Select {
            source: Box::new(self.clone()),
            lambda: Lambda {
                param: name,
                body: Box::new(body),
            },
        })
    }

    pub fn to_list(self) -> Expr {
        Expr::Call(Call::ToList(Box::new(self)))
    }

    pub fn one(self) -> Expr {
        Expr::Call(Call::One(Box::new(self)))
    }

    fn aggregate(&self, function: AggregateFunction) -> Expr {
        Expr::Call(Call::Aggregate {
            function,
            source: Box::new(self.clone()),
        })
    }

    pub fn count(&self) -> Expr {
        self.aggregate(AggregateFunction::Count)
    }

    pub fn sum(&self) -> Expr {
        self.aggregate(AggregateFunction::Sum)
    }

    pub fn avg(&self) -> Expr {
        self.aggregate(AggregateFunction::Avg)
    }

    pub fn min(&self) -> Expr {
        self.aggregate(AggregateFunction::Min)
    }

    pub fn max(&self) -> Expr {
        self.aggregate(AggregateFunction::Max)
    }

    // ==================== scalar functions ====================

    fn scalar(self, function: ScalarFunction) -> Expr {
        Expr::Call(Call::Scalar {
            function,
            operand: Box::new(self),
        })
    }

    pub fn upper(self) -> Expr {
        self.scalar(ScalarFunction::Upper)
    }

    pub fn lower(self) -> Expr {
        self.scalar(ScalarFunction::Lower)
    }

    pub fn length(self) -> Expr {
        self.scalar(ScalarFunction::Length)
    }

    pub fn abs(self) -> Expr {
        self.scalar(ScalarFunction::Abs)
    }

    /// An arbitrary method call. The compiler rejects these; they exist so
    /// callers can express (and get diagnostics for) unsupported mappings.
    pub fn method(self, name: impl Into<CompactString>, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Call(Call::Method {
            name: name.into(),
            receiver: Box::new(self),
            args: args.into_iter().collect(),
        })
    }

    // ==================== analysis ====================

    /// True if any sub-node references the row parameter or a lambda
    /// parameter (lambda parameters always range over row data).
    pub fn depends_on_row(&self) -> bool {
        match self {
            Expr::Param(ParamRef::Row | ParamRef::Var(_)) => true,
            Expr::Param(ParamRef::Args) | Expr::Constant(_) => false,
            Expr::Member { object, .. } => object.depends_on_row(),
            Expr::Unary { operand, .. } => operand.depends_on_row(),
            Expr::Binary { left, right, .. } => left.depends_on_row() || right.depends_on_row(),
            Expr::Construct(items) | Expr::Array(items) => items.iter().any(Expr::depends_on_row),
            Expr::MemberInit(members) => members.iter().any(|(_, e)| e.depends_on_row()),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => test.depends_on_row() || if_true.depends_on_row() || if_false.depends_on_row(),
            Expr::Case(case) => case.sub_expressions().any(Expr::depends_on_row),
            Expr::Call(call) => match call {
                Call::RowNumber | Call::Select { .. } => true,
                Call::Aggregate { source, .. } => source.depends_on_row(),
                Call::Scalar { operand, .. } => operand.depends_on_row(),
                Call::ToList(e) | Call::One(e) => e.depends_on_row(),
                Call::In { value, set } | Call::Contains { set, value } => {
                    value.depends_on_row() || set.depends_on_row()
                }
                Call::Method { receiver, args, .. } => {
                    receiver.depends_on_row() || args.iter().any(Expr::depends_on_row)
                }
            },
        }
    }

    pub fn depends_on_args(&self) -> bool {
        match self {
            Expr::Param(ParamRef::Args) => true,
            Expr::Param(_) | Expr::Constant(_) => false,
            Expr::Member { object, .. } => object.depends_on_args(),
            Expr::Unary { operand, .. } => operand.depends_on_args(),
            Expr::Binary { left, right, .. } => left.depends_on_args() || right.depends_on_args(),
            Expr::Construct(items) | Expr::Array(items) => items.iter().any(Expr::depends_on_args),
            Expr::MemberInit(members) => members.iter().any(|(_, e)| e.depends_on_args()),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => test.depends_on_args() || if_true.depends_on_args() || if_false.depends_on_args(),
            Expr::Case(case) => case.sub_expressions().any(Expr::depends_on_args),
            Expr::Call(call) => match call {
                Call::RowNumber => false,
                Call::Select { source, lambda } => {
                    source.depends_on_args() || lambda.body.depends_on_args()
                }
                Call::Aggregate { source, .. } => source.depends_on_args(),
                Call::Scalar { operand, .. } => operand.depends_on_args(),
                Call::ToList(e) | Call::One(e) => e.depends_on_args(),
                Call::In { value, set } | Call::Contains { set, value } => {
                    value.depends_on_args() || set.depends_on_args()
                }
                Call::Method { receiver, args, .. } => {
                    receiver.depends_on_args() || args.iter().any(Expr::depends_on_args)
                }
            },
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Constant(value)
    }
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'a Expr>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param(ParamRef::Row) => f.write_str("q"),
            Expr::Param(ParamRef::Args) => f.write_str("args"),
            Expr::Param(ParamRef::Var(name)) => f.write_str(name),
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Member { object, name } => write!(f, "{object}.{name}"),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{operand}"),
            Expr::Unary {
                op: UnaryOp::Negate,
                operand,
            } => write!(f, "-{operand}"),
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Construct(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Expr::Array(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::MemberInit(members) => {
                f.write_str("{ ")?;
                for (i, (name, expr)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {expr}")?;
                }
                f.write_str(" }")
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({test} ? {if_true} : {if_false})"),
            Expr::Case(case) => write!(f, "{case}"),
            Expr::Call(call) => match call {
                Call::Aggregate { function, source } => {
                    write!(f, "{source}.{}()", function.method_name())
                }
                Call::Scalar { function, operand } => {
                    write!(f, "{operand}.{}()", function.method_name())
                }
                Call::Select { source, lambda } => {
                    write!(f, "{source}.select({} => {})", lambda.param, lambda.body)
                }
                Call::ToList(source) => write!(f, "{source}.to_list()"),
                Call::One(source) => write!(f, "{source}.one()"),
                Call::RowNumber => f.write_str("row_number()"),
                Call::In { value, set } => write!(f, "{value}.is_in({set})"),
                Call::Contains { set, value } => write!(f, "{set}.contains({value})"),
                Call::Method {
                    name,
                    receiver,
                    args,
                } => {
                    write!(f, "{receiver}.{name}(")?;
                    write_list(f, args)?;
                    f.write_str(")")
                }
            },
        }
    }
}
