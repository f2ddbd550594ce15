//! Cell conversion into the declared output type.

use serde_json::{Number, Value as Json};

use crate::error::{Result, RowshapeError};
use crate::value::{Value, ValueType};

/// A converted cell; `inefficient` marks a conversion between two collection
/// representations (text <-> bytes) that the caller could have avoided.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Converted {
    pub(crate) json: Json,
    pub(crate) inefficient: bool,
}

impl Converted {
    fn direct(json: Json) -> Self {
        Self {
            json,
            inefficient: false,
        }
    }
}

fn mismatch(value: &Value, ty: ValueType) -> RowshapeError {
    RowshapeError::Conversion(format!("cannot convert {value} to {ty:?}"))
}

fn real(f: f64) -> Result<Json> {
    Number::from_f64(f)
        .map(Json::Number)
        .ok_or_else(|| RowshapeError::Conversion(format!("{f} has no JSON representation")))
}

/// `f` as an `i64`, when it is integral and in range.
pub(crate) fn integral(f: f64) -> Option<i64> {
    // 2^63 is exact as an f64; the range is [-2^63, 2^63)
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

fn bytes(b: &[u8]) -> Json {
    Json::Array(b.iter().map(|byte| Json::from(*byte)).collect())
}

pub(crate) fn convert(value: &Value, ty: ValueType) -> Result<Converted> {
    if value.is_null() {
        return Ok(Converted::direct(Json::Null));
    }
    let json = match (ty, value) {
        (ValueType::Any, value) => return natural(value).map(Converted::direct),

        (ValueType::Integer, Value::Integer(i)) => Json::from(*i),
        (ValueType::Integer, Value::Real(f)) if f.fract() == 0.0 => {
            Json::from(integral(*f).ok_or_else(|| {
                RowshapeError::Conversion(format!("{f} is outside the range of a 64-bit integer"))
            })?)
        }
        (ValueType::Integer, Value::Bool(b)) => Json::from(i64::from(*b)),

        (ValueType::Real, Value::Real(f)) => real(*f)?,
        (ValueType::Real, Value::Integer(i)) => real(*i as f64)?,

        (ValueType::Bool, Value::Bool(b)) => Json::Bool(*b),
        (ValueType::Bool, Value::Integer(i)) => Json::Bool(*i != 0),

        (ValueType::Text, Value::Text(s)) => Json::String(s.clone()),
        (ValueType::Text, Value::Blob(b)) => {
            let text = String::from_utf8(b.clone())
                .map_err(|_| RowshapeError::Conversion("blob is not valid UTF-8 text".into()))?;
            return Ok(Converted {
                json: Json::String(text),
                inefficient: true,
            });
        }

        (ValueType::Bytes, Value::Blob(b)) => bytes(b),
        (ValueType::Bytes, Value::Text(s)) => {
            return Ok(Converted {
                json: bytes(s.as_bytes()),
                inefficient: true,
            });
        }

        (ty, value) => return Err(mismatch(value, ty)),
    };
    Ok(Converted::direct(json))
}

fn natural(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Integer(i) => Json::from(*i),
        Value::Real(f) => real(*f)?,
        Value::Text(s) => Json::String(s.clone()),
        Value::Blob(b) => bytes(b),
        Value::Bool(b) => Json::Bool(*b),
        Value::List(items) => Json::Array(items.iter().map(natural).collect::<Result<_>>()?),
    })
}
