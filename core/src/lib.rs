pub mod accumulator;
pub mod assembler;
pub mod compiler;
pub mod dialect;
pub mod driver;
pub mod element;
pub mod error;
pub mod expr;
pub mod logging;
pub mod materialize;
pub mod params;
pub mod query;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod sql;
pub mod statement;
pub mod syntax;
pub mod target;
pub mod value;

// Re-export key types and traits
pub use accumulator::{Accumulator, AggregationType, UnaryOperator};
pub use dialect::Dialect;
pub use driver::{AsyncExecutor, BufferedRows, Executor, Row, RowReader, RowStream};
pub use error::{Result, RowshapeError};
pub use expr::{AggregateFunction, BinaryOp, Expr, ScalarFunction};
pub use logging::{LogCode, LogLevel, Logger, NullLogger, TracingLogger};
pub use query::{CompiledQuery, QueryBuilder};
pub use schema::{Cardinality, ColumnSchema, NamingResolver, SnakeCaseNaming, TableSchema, VerbatimNaming};
pub use settings::{Settings, TempIdSequence};
pub use sql::{RenderedSql, SQL, SQLChunk, Token};
pub use syntax::{AnsiSyntax, ROW_ID, RowIdStrategy, SqlSyntax};
pub use value::{Value, ValueType};
