//! # rowshape
//!
//! Compiles object-shaped mappings over joined tables into a single SQL
//! `SELECT`, then rebuilds the nested values from the flat rows the database
//! returns.
//!
//! ```
//! use rowshape::prelude::*;
//!
//! let person = TableSchema::new("person")
//!     .field("id", ValueType::Integer)
//!     .field("name", ValueType::Text)
//!     .shared();
//! let class = TableSchema::new("class")
//!     .field("person_id", ValueType::Integer)
//!     .field("title", ValueType::Text)
//!     .shared();
//!
//! let q = Expr::row();
//! let query = QueryBuilder::from_as("person", person)
//!     .left_join(
//!         "classes",
//!         class,
//!         Cardinality::Many,
//!         q.field("classes").field("person_id").eq(q.field("person").field("id")),
//!     )
//!     .map(&Expr::object([
//!         ("name", q.field("person").field("name")),
//!         ("titles", q.field("classes").select("c", |c| c.field("title"))),
//!     ]))?;
//!
//! let sql = query.to_sql(&())?;
//! assert!(sql.text.starts_with(r#"SELECT "t0"."name" AS "name""#));
//! # Ok::<(), rowshape::RowshapeError>(())
//! ```
//!
//! With the `rusqlite` feature, [`sqlite::SqliteConnection`] executes
//! compiled queries; with `tokio-postgres`, [`postgres::PostgresClient`]
//! does the same asynchronously.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use rowshape_core::error::{Result, RowshapeError};
pub use rowshape_core::{
    Cardinality, CompiledQuery, Dialect, Expr, QueryBuilder, Settings, TableSchema, Value,
    ValueType,
};

pub mod error {
    pub use rowshape_core::error::*;
}

/// Lower-level building blocks: the compiler, resolver, assembler and
/// materializer, plus the driver contracts.
pub mod core {
    pub use rowshape_core::{
        accumulator, assembler, compiler, driver, element, expr, logging, materialize, params,
        resolver, schema, settings, sql, statement, syntax, target, value,
    };

    pub use rowshape_core::{
        AnsiSyntax, AsyncExecutor, BufferedRows, Executor, Row, RowIdStrategy, RowReader,
        RowStream, SqlSyntax,
    };
}

pub mod logging {
    pub use rowshape_core::logging::*;
    pub use rowshape_core::rowshape_log;
}

#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use rowshape_sqlite::SqliteSyntax;

    #[cfg(feature = "rusqlite")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rusqlite")))]
    pub use rowshape_sqlite::SqliteConnection;

    /// The driver crate, at the version the executor was built against.
    #[cfg(feature = "rusqlite")]
    pub use ::rusqlite;
}

#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use rowshape_postgres::PostgresSyntax;

    #[cfg(feature = "tokio-postgres")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio-postgres")))]
    pub use rowshape_postgres::{PgParam, PostgresClient};

    #[cfg(feature = "tokio-postgres")]
    pub use ::tokio_postgres;
}

pub mod prelude {
    pub use rowshape_core::{
        AggregateFunction, AsyncExecutor, BinaryOp, Cardinality, CompiledQuery, Executor, Expr,
        LogCode, LogLevel, Logger, NullLogger, QueryBuilder, Result, RowshapeError,
        ScalarFunction, Settings, SnakeCaseNaming, TableSchema, TracingLogger, Value, ValueType,
        VerbatimNaming,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::SqliteSyntax;
    #[cfg(feature = "rusqlite")]
    pub use crate::sqlite::SqliteConnection;

    #[cfg(feature = "postgres")]
    pub use crate::postgres::PostgresSyntax;
    #[cfg(feature = "tokio-postgres")]
    pub use crate::postgres::PostgresClient;
}
