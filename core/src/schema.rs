//! Table descriptions and member → column naming.

use core::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use heck::ToSnakeCase;

use crate::value::ValueType;

/// Maps a mapping-side member name to a physical column name.
pub trait NamingResolver: Send + Sync + fmt::Debug {
    fn column_name(&self, table: &str, member: &str) -> CompactString;
}

/// `FirstName` → `first_name`
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseNaming;

impl NamingResolver for SnakeCaseNaming {
    fn column_name(&self, _table: &str, member: &str) -> CompactString {
        CompactString::from(member.to_snake_case())
    }
}

/// Uses member names unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimNaming;

impl NamingResolver for VerbatimNaming {
    fn column_name(&self, _table: &str, member: &str) -> CompactString {
        CompactString::from(member)
    }
}

/// How many rows of a joined table belong to one row of the query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// At most one row: materialized as a nested object (or null)
    #[default]
    One,
    /// Any number of rows: materialized as a collection
    Many,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Member name used by mappings
    pub field: CompactString,
    /// Explicit column name; the `NamingResolver` decides when absent
    pub column: Option<CompactString>,
    pub ty: ValueType,
}

impl ColumnSchema {
    pub fn column_name(&self, table: &str, naming: &dyn NamingResolver) -> CompactString {
        match &self.column {
            Some(column) => column.clone(),
            None => naming.column_name(table, &self.field),
        }
    }
}

/// A table's row type: its name and ordered scalar fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: CompactString,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a field whose column name comes from the naming resolver.
    pub fn field(mut self, field: impl Into<CompactString>, ty: ValueType) -> Self {
        self.columns.push(ColumnSchema {
            field: field.into(),
            column: None,
            ty,
        });
        self
    }

    /// Adds a field stored under an explicit column name.
    pub fn field_as(
        mut self,
        field: impl Into<CompactString>,
        column: impl Into<CompactString>,
        ty: ValueType,
    ) -> Self {
        self.columns.push(ColumnSchema {
            field: field.into(),
            column: Some(column.into()),
            ty,
        });
        self
    }

    pub fn find(&self, field: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn shared(self) -> Arc<TableSchema> {
        Arc::new(self)
    }
}
