//! Driver contracts: the only things the core needs from a database.

#[cfg(feature = "rusqlite")]
mod rusqlite;

use core::future::Future;
use core::pin::Pin;
use std::sync::Arc;

use compact_str::CompactString;
use futures_util::Stream;

use crate::error::Result;
use crate::value::Value;

/// One result row: its column names (shared by every row of a result) and
/// its cells, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[CompactString]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[CompactString]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    #[inline]
    pub fn columns(&self) -> &[CompactString] {
        &self.columns
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }
}

/// Forward-only cursor over a result.
pub trait RowReader {
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Synchronous connection.
pub trait Executor {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn RowReader + '_>>;
}

pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row>> + Send + 'a>>;

/// Asynchronous connection. Rows are consumed strictly in arrival order.
pub trait AsyncExecutor: Sync {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> impl Future<Output = Result<RowStream<'a>>> + Send + 'a;
}

/// Rows already held in memory.
#[derive(Debug, Clone)]
pub struct BufferedRows {
    rows: std::vec::IntoIter<Row>,
}

impl BufferedRows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowReader for BufferedRows {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}

impl From<Vec<Row>> for BufferedRows {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_their_header() {
        let columns: Arc<[CompactString]> = Arc::from(vec!["a".into(), "b".into()]);
        let mut reader = BufferedRows::new(vec![
            Row::new(Arc::clone(&columns), vec![Value::Integer(1), Value::Null]),
            Row::new(columns, vec![Value::Integer(2), Value::Text("x".into())]),
        ]);

        let first = reader.next_row().unwrap().unwrap();
        assert_eq!(first.get_by_name("a"), Some(&Value::Integer(1)));
        let second = reader.next_row().unwrap().unwrap();
        assert_eq!(second.get(1), Some(&Value::Text("x".into())));
        assert!(reader.next_row().unwrap().is_none());
    }
}
