//! Runtime values exchanged with drivers and declared output types.

use core::fmt;

use crate::error::{Result, RowshapeError};

/// A single SQL value: a bound parameter or a cell read back from a driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
    /// Only valid as a membership-test parameter; expanded to one placeholder
    /// per element when bound.
    List(Vec<Value>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The natural declared type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null | Value::List(_) => ValueType::Any,
            Value::Integer(_) => ValueType::Integer,
            Value::Real(_) => ValueType::Real,
            Value::Text(_) => ValueType::Text,
            Value::Blob(_) => ValueType::Bytes,
            Value::Bool(_) => ValueType::Bool,
        }
    }

    /// Row-id cells are integers; anything else is treated as absent.
    pub fn as_row_id(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => crate::materialize::integral(*f),
            _ => None,
        }
    }

    /// Converts an argument value (already serialized to JSON) into a `Value`.
    pub fn from_json(json: &serde_json::Value) -> Result<Value> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().ok_or_else(|| {
                    RowshapeError::Parameter(format!("number {n} is out of range"))
                })?),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::List(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(_) => {
                return Err(RowshapeError::Parameter(
                    "objects cannot be bound as SQL parameters".into(),
                ));
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => { $(
        impl From<$ty> for Value {
            #[inline]
            fn from(value: $ty) -> Self {
                Value::$variant(value $(as $cast)?)
            }
        }
    )* }
}

impl_value_from!(
    i8 => Integer as i64,
    i16 => Integer as i64,
    i32 => Integer as i64,
    i64 => Integer,
    u8 => Integer as i64,
    u16 => Integer as i64,
    u32 => Integer as i64,
    f32 => Real as f64,
    f64 => Real,
    bool => Bool,
    String => Text,
    Vec<u8> => Blob,
);

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    #[inline]
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Declared type of a mapped output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Whatever the driver returns, unconverted
    #[default]
    Any,
    Integer,
    Real,
    Text,
    Bool,
    /// Binary data, materialized as an array of byte values
    Bytes,
}

impl ValueType {
    pub const fn is_numeric(self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Real)
    }

    /// Result type of an arithmetic operation over `self` and `other`.
    pub const fn widen(self, other: ValueType) -> ValueType {
        match (self, other) {
            (ValueType::Integer, ValueType::Integer) => ValueType::Integer,
            (ValueType::Real, ValueType::Integer | ValueType::Real)
            | (ValueType::Integer, ValueType::Real) => ValueType::Real,
            (ValueType::Text, ValueType::Text) => ValueType::Text,
            (ValueType::Any, other) | (other, ValueType::Any) => other,
            _ => ValueType::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_and_primitives_convert() {
        assert_eq!(Value::from(42i32), Value::Integer(42));
        assert_eq!(Value::from(2.5f64), Value::Real(2.5));
        assert_eq!(Value::from("hi"), Value::Text("hi".into()));
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }

    #[test]
    fn row_ids_from_reals_stay_in_range() {
        assert_eq!(Value::Real(7.0).as_row_id(), Some(7));
        assert_eq!(Value::Real(7.5).as_row_id(), None);
        assert_eq!(Value::Real(1e19).as_row_id(), None);
    }

    #[test]
    fn json_arguments_convert() {
        let json = serde_json::json!([1, 2.5, "x", null]);
        assert_eq!(
            Value::from_json(&json).unwrap(),
            Value::List(vec![
                Value::Integer(1),
                Value::Real(2.5),
                Value::Text("x".into()),
                Value::Null
            ])
        );
        assert!(Value::from_json(&serde_json::json!({ "a": 1 })).is_err());
    }

    #[test]
    fn arithmetic_widening() {
        assert_eq!(ValueType::Integer.widen(ValueType::Integer), ValueType::Integer);
        assert_eq!(ValueType::Integer.widen(ValueType::Real), ValueType::Real);
        assert_eq!(ValueType::Any.widen(ValueType::Text), ValueType::Text);
    }
}
