//! The statement catalog: the joined tables a mapping is compiled against,
//! plus the clauses that are not part of the projection.

use std::sync::Arc;

use compact_str::{CompactString, format_compact};

use crate::accumulator::Accumulator;
use crate::element::ResolvedElement;
use crate::schema::{Cardinality, ColumnSchema, TableSchema};
use crate::syntax::ROW_ID;

/// Index of a table inside its [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

impl TableId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementTable {
    pub id: TableId,
    /// SQL alias, `t0`, `t1`, ...
    pub alias: CompactString,
    /// Member of the query shape this table is reached through; empty when
    /// the shape *is* this table
    pub path: CompactString,
    pub schema: Arc<TableSchema>,
    pub cardinality: Cardinality,
    /// `None` for the primary table
    pub join: Option<JoinKind>,
    pub on: Option<Accumulator<ResolvedElement>>,
}

impl StatementTable {
    pub fn is_primary(&self) -> bool {
        self.join.is_none()
    }
}

/// What a property path names within the query shape.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'s> {
    /// The shape itself, when it is an aggregate of several tables
    Shape,
    Table(&'s StatementTable),
    Column(&'s StatementTable, &'s ColumnSchema),
    RowId(&'s StatementTable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub tables: Vec<StatementTable>,
    pub filter: Option<Accumulator<ResolvedElement>>,
    pub order: Vec<(Accumulator<ResolvedElement>, SortDirection)>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl Statement {
    /// A statement over a single primary table. Pass an empty `path` when
    /// the query shape is the table's row type itself.
    pub fn new(path: impl Into<CompactString>, schema: Arc<TableSchema>) -> Self {
        Self {
            tables: vec![StatementTable {
                id: TableId(0),
                alias: CompactString::const_new("t0"),
                path: path.into(),
                schema,
                cardinality: Cardinality::One,
                join: None,
                on: None,
            }],
            filter: None,
            order: Vec::new(),
            skip: None,
            take: None,
        }
    }

    /// Adds a joined table. Its condition is attached separately, once the
    /// table is visible to the compiler.
    pub fn add_table(
        &mut self,
        path: impl Into<CompactString>,
        schema: Arc<TableSchema>,
        cardinality: Cardinality,
        join: JoinKind,
    ) -> TableId {
        let id = TableId(self.tables.len());
        self.tables.push(StatementTable {
            id,
            alias: format_compact!("t{}", id.0),
            path: path.into(),
            schema,
            cardinality,
            join: Some(join),
            on: None,
        });
        id
    }

    #[inline]
    pub fn primary(&self) -> &StatementTable {
        &self.tables[0]
    }

    #[inline]
    pub fn table(&self, id: TableId) -> &StatementTable {
        &self.tables[id.0]
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut StatementTable {
        &mut self.tables[id.0]
    }

    /// Member names of the query shape, in declaration order. Empty when the
    /// shape is the primary table's row.
    pub fn shape_members(&self) -> Vec<&str> {
        if self.primary().path.is_empty() {
            return Vec::new();
        }
        self.tables.iter().map(|t| t.path.as_str()).collect()
    }

    /// Resolves a fully qualified path (starting at the shape parameter).
    pub fn lookup(&self, path: &[CompactString]) -> Option<Lookup<'_>> {
        let Some((first, rest)) = path.split_first() else {
            return Some(if self.primary().path.is_empty() {
                Lookup::Table(self.primary())
            } else {
                Lookup::Shape
            });
        };

        if let Some(table) = self
            .tables
            .iter()
            .find(|t| !t.path.is_empty() && t.path == *first)
        {
            return Self::lookup_in(table, rest);
        }
        if self.primary().path.is_empty() {
            return Self::lookup_in(self.primary(), path);
        }
        None
    }

    fn lookup_in<'s>(table: &'s StatementTable, rest: &[CompactString]) -> Option<Lookup<'s>> {
        match rest {
            [] => Some(Lookup::Table(table)),
            [member] if member == ROW_ID => Some(Lookup::RowId(table)),
            [member] => table
                .schema
                .find(member)
                .map(|column| Lookup::Column(table, column)),
            _ => None,
        }
    }
}
