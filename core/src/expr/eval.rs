//! Evaluation of row-independent sub-expressions.
//!
//! Constant subtrees are evaluated once at compile time; subtrees that reach
//! the arguments parameter are evaluated per execution against the
//! serialized arguments.

use core::cmp::Ordering;

use crate::error::{Result, RowshapeError};
use crate::value::Value;

use super::{BinaryOp, Call, CaseExpr, Expr, ParamRef, ScalarFunction, UnaryOp};

pub(crate) fn evaluate(expr: &Expr, args: &serde_json::Value) -> Result<Value> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Param(ParamRef::Args) | Expr::Member { .. } => {
            let json = navigate(expr, args)?;
            Value::from_json(json)
        }
        Expr::Param(_) => Err(RowshapeError::invariant(format!(
            "`{expr}` depends on row data and cannot be evaluated"
        ))),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, args)?;
            unary(*op, value).ok_or_else(|| type_error(expr))
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, args)?;
            let r = evaluate(right, args)?;
            binary(*op, l, r).ok_or_else(|| type_error(expr))
        }
        Expr::Construct(items) | Expr::Array(items) => Ok(Value::List(
            items
                .iter()
                .map(|e| evaluate(e, args))
                .collect::<Result<Vec<_>>>()?,
        )),
        Expr::MemberInit(_) => Err(RowshapeError::unsupported(
            expr,
            "objects cannot be used as SQL parameters",
        )),
        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => {
            if truthy(&evaluate(test, args)?) {
                evaluate(if_true, args)
            } else {
                evaluate(if_false, args)
            }
        }
        Expr::Case(CaseExpr::Searched {
            branches,
            otherwise,
        }) => {
            for (when, then) in branches {
                if truthy(&evaluate(when, args)?) {
                    return evaluate(then, args);
                }
            }
            evaluate(otherwise, args)
        }
        Expr::Case(CaseExpr::Simple {
            subject,
            branches,
            otherwise,
        }) => {
            let subject = evaluate(subject, args)?;
            for (when, then) in branches {
                if compare(&subject, &evaluate(when, args)?) == Some(Ordering::Equal) {
                    return evaluate(then, args);
                }
            }
            evaluate(otherwise, args)
        }
        Expr::Call(Call::In { value, set }) | Expr::Call(Call::Contains { set, value }) => {
            let value = evaluate(value, args)?;
            match evaluate(set, args)? {
                Value::List(items) => Ok(Value::Bool(
                    items
                        .iter()
                        .any(|item| compare(&value, item) == Some(Ordering::Equal)),
                )),
                _ => Err(type_error(expr)),
            }
        }
        Expr::Call(Call::Scalar { function, operand }) => {
            let value = evaluate(operand, args)?;
            scalar(*function, value).ok_or_else(|| type_error(expr))
        }
        Expr::Call(_) => Err(RowshapeError::unsupported(
            expr,
            "method cannot be evaluated without row data",
        )),
    }
}

fn navigate<'a>(expr: &Expr, args: &'a serde_json::Value) -> Result<&'a serde_json::Value> {
    match expr {
        Expr::Param(ParamRef::Args) => Ok(args),
        Expr::Member { object, name } => {
            let parent = navigate(object, args)?;
            parent.get(name.as_str()).ok_or_else(|| {
                RowshapeError::Parameter(format!("argument `{expr}` was not supplied"))
            })
        }
        _ => Err(RowshapeError::unsupported(
            expr,
            "only members of the arguments object can be read",
        )),
    }
}

fn type_error(expr: &Expr) -> RowshapeError {
    RowshapeError::Parameter(format!("`{expr}` cannot be evaluated for these operand types"))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Integer(i) => *i != 0,
        _ => false,
    }
}

fn unary(op: UnaryOp, value: Value) -> Option<Value> {
    Some(match (op, value) {
        (_, Value::Null) => Value::Null,
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Not, Value::Integer(i)) => Value::Bool(i == 0),
        (UnaryOp::Negate, Value::Integer(i)) => Value::Integer(i.checked_neg()?),
        (UnaryOp::Negate, Value::Real(r)) => Value::Real(-r),
        _ => return None,
    })
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
        (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Option<Value> {
    if l.is_null() || r.is_null() {
        return Some(Value::Null);
    }
    if op.is_comparison() {
        let ordering = compare(&l, &r)?;
        return Some(Value::Bool(match op {
            BinaryOp::Equal => ordering == Ordering::Equal,
            BinaryOp::NotEqual => ordering != Ordering::Equal,
            BinaryOp::Less => ordering == Ordering::Less,
            BinaryOp::LessOrEqual => ordering != Ordering::Greater,
            BinaryOp::Greater => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        }));
    }
    Some(match (op, l, r) {
        (BinaryOp::And, a, b) => Value::Bool(truthy(&a) && truthy(&b)),
        (BinaryOp::Or, a, b) => Value::Bool(truthy(&a) || truthy(&b)),
        (BinaryOp::Add, Value::Text(a), Value::Text(b)) => Value::Text(a + &b),
        (op, Value::Integer(a), Value::Integer(b)) => Value::Integer(match op {
            BinaryOp::Add => a.checked_add(b)?,
            BinaryOp::Subtract => a.checked_sub(b)?,
            BinaryOp::Multiply => a.checked_mul(b)?,
            BinaryOp::Divide => a.checked_div(b)?,
            BinaryOp::Modulo => a.checked_rem(b)?,
            _ => return None,
        }),
        (op, a, b) => {
            let (a, b) = (as_real(&a)?, as_real(&b)?);
            Value::Real(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => a / b,
                BinaryOp::Modulo => a % b,
                _ => return None,
            })
        }
    })
}

fn as_real(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(r) => Some(*r),
        _ => None,
    }
}

fn scalar(function: ScalarFunction, value: Value) -> Option<Value> {
    Some(match (function, value) {
        (_, Value::Null) => Value::Null,
        (ScalarFunction::Upper, Value::Text(s)) => Value::Text(s.to_uppercase()),
        (ScalarFunction::Lower, Value::Text(s)) => Value::Text(s.to_lowercase()),
        (ScalarFunction::Length, Value::Text(s)) => Value::Integer(s.chars().count() as i64),
        (ScalarFunction::Length, Value::Blob(b)) => Value::Integer(b.len() as i64),
        (ScalarFunction::Abs, Value::Integer(i)) => Value::Integer(i.checked_abs()?),
        (ScalarFunction::Abs, Value::Real(r)) => Value::Real(r.abs()),
        _ => return None,
    })
}
