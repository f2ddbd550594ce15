//! Shared schemas and helpers.
//!
//! person(id, name, age), class(id, person_id, title) and
//! address(person_id, city). The seeded data has John (two classes, one
//! address) and Mary (one class, no address).

#[cfg(feature = "rusqlite")]
mod rusqlite;
#[cfg(feature = "rusqlite")]
pub use rusqlite::*;

use std::sync::{Arc, Mutex};

use rowshape::prelude::*;

pub fn person() -> Arc<TableSchema> {
    TableSchema::new("person")
        .field("id", ValueType::Integer)
        .field("name", ValueType::Text)
        .field("age", ValueType::Integer)
        .shared()
}

pub fn class() -> Arc<TableSchema> {
    TableSchema::new("class")
        .field("id", ValueType::Integer)
        .field("person_id", ValueType::Integer)
        .field("title", ValueType::Text)
        .shared()
}

pub fn address() -> Arc<TableSchema> {
    TableSchema::new("address")
        .field("person_id", ValueType::Integer)
        .field("city", ValueType::Text)
        .shared()
}

/// Adds `classes` (many) and `address` (one) to a query rooted at `person`.
pub fn with_joins(query: QueryBuilder) -> QueryBuilder {
    let q = Expr::row();
    query
        .left_join(
            "classes",
            class(),
            Cardinality::Many,
            q.field("classes").field("person_id").eq(q.field("person").field("id")),
        )
        .left_join(
            "address",
            address(),
            Cardinality::One,
            q.field("address").field("person_id").eq(q.field("person").field("id")),
        )
}

/// Records every message it receives.
#[derive(Debug, Default)]
pub struct CaptureLogger {
    messages: Mutex<Vec<(LogLevel, LogCode, String)>>,
}

impl CaptureLogger {
    pub fn codes(&self) -> Vec<LogCode> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, code, _)| *code)
            .collect()
    }

    pub fn messages(&self, code: LogCode) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c, _)| *c == code)
            .map(|(_, _, message)| message.clone())
            .collect()
    }
}

impl Logger for CaptureLogger {
    fn enabled(&self, _level: LogLevel) -> bool {
        true
    }

    fn log(&self, level: LogLevel, code: LogCode, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, code, message.to_owned()));
    }
}
