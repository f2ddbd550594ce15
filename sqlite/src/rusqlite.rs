use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use ::rusqlite::{Connection, params_from_iter};
use compact_str::CompactString;
use rowshape_core::{
    BufferedRows, Executor, QueryBuilder, Result, Row, RowReader, Settings, TableSchema, Value,
};

use crate::SqliteSyntax;

/// A [`rusqlite::Connection`] that can execute compiled mappings.
///
/// Queries started from [`SqliteConnection::from`] pick up this connection's
/// [`Settings`], so they render with [`SqliteSyntax`] unless told otherwise.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
    settings: Settings,
}

impl SqliteConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            settings: SqliteSyntax::new().settings(),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn mut_conn(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    /// Starts a query whose shape is the row of `table`.
    pub fn from(&self, table: Arc<TableSchema>) -> QueryBuilder {
        QueryBuilder::from(table).with_settings(self.settings.clone())
    }

    /// Starts a query whose shape has `table` as its member `path`.
    pub fn from_as(&self, path: impl Into<CompactString>, table: Arc<TableSchema>) -> QueryBuilder {
        QueryBuilder::from_as(path, table).with_settings(self.settings.clone())
    }
}

impl Deref for SqliteConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for SqliteConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Executor for SqliteConnection {
    /// Reads the whole result before returning; rusqlite rows borrow their
    /// statement.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn RowReader + '_>> {
        tracing::debug!(sql = %sql, params = params.len(), "rowshape.query");

        let mut stmt = self.conn.prepare(sql)?;
        let columns: Arc<[CompactString]> = stmt
            .column_names()
            .into_iter()
            .map(CompactString::from)
            .collect();

        let mut rows = stmt.query(params_from_iter(params))?;
        let mut buffered = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<::rusqlite::Result<Vec<_>>>()?;
            buffered.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(Box::new(BufferedRows::new(buffered)))
    }
}
