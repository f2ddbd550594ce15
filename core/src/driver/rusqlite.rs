//! `Value` <-> rusqlite conversions.

use ::rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::RowshapeError;
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(&self) -> ::rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(::rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(::rusqlite::types::Value::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(::rusqlite::types::Value::Real(*f)),
            Value::Bool(b) => ToSqlOutput::Owned(::rusqlite::types::Value::Integer(i64::from(*b))),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_ref())),
            Value::List(_) => {
                return Err(::rusqlite::Error::ToSqlConversionFailure(Box::new(
                    RowshapeError::Parameter(
                        "list parameters must be expanded before binding".into(),
                    ),
                )));
            }
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(items) => Value::Text(String::from_utf8_lossy(items).into_owned()),
            ValueRef::Blob(items) => Value::Blob(items.to_vec()),
        })
    }
}
