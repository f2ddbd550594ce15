//! SQLite dialect for rowshape
//!
//! [`SqliteSyntax`] renders compiled mappings for SQLite. With the `rusqlite`
//! feature, [`SqliteConnection`] runs them against a [`rusqlite::Connection`].

#[cfg(feature = "rusqlite")]
mod rusqlite;

#[cfg(feature = "rusqlite")]
pub use rusqlite::SqliteConnection;

use compact_str::CompactString;
use rowshape_core::{AnsiSyntax, Dialect, RowIdStrategy, SQL, SQLChunk, Settings, SqlSyntax};

/// SQLite rendering.
///
/// Row ids default to `ROW_NUMBER() OVER ()`, which needs SQLite 3.25 or
/// newer. Older engines can number rows through the table's own `rowid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSyntax {
    row_ids: RowIdStrategy,
}

impl SqliteSyntax {
    pub const fn new() -> Self {
        Self {
            row_ids: RowIdStrategy::Window,
        }
    }

    /// Uses the engine's `rowid` column directly. Only valid for tables that
    /// were not declared `WITHOUT ROWID`.
    pub fn native_row_ids() -> Self {
        Self {
            row_ids: RowIdStrategy::Native("rowid".into()),
        }
    }

    /// Numbers rows with a correlated `COUNT(*)` over `key`, for engines
    /// without window functions.
    pub fn emulated_row_ids(key: impl Into<CompactString>) -> Self {
        Self {
            row_ids: RowIdStrategy::Emulated(key.into()),
        }
    }

    pub fn settings(self) -> Settings {
        Settings::new(self)
    }
}

impl Default for SqliteSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlSyntax for SqliteSyntax {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn row_id_strategy(&self) -> RowIdStrategy {
        self.row_ids.clone()
    }

    // SQLite has no bare OFFSET; a negative LIMIT means unbounded.
    fn paging(&self, skip: Option<u64>, take: Option<u64>) -> Option<SQL> {
        match (skip, take) {
            (Some(skip), None) => Some(SQL::raw("LIMIT -1 OFFSET").push(SQLChunk::Number(skip))),
            _ => AnsiSyntax.paging(skip, take),
        }
    }
}
