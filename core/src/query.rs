//! The front door: build a statement, map it, execute the result.
//!
//! ```
//! use rowshape_core::expr::Expr;
//! use rowshape_core::query::QueryBuilder;
//! use rowshape_core::schema::{Cardinality, TableSchema};
//! use rowshape_core::value::ValueType;
//!
//! let person = TableSchema::new("person")
//!     .field("id", ValueType::Integer)
//!     .field("name", ValueType::Text)
//!     .shared();
//! let class = TableSchema::new("class")
//!     .field("id", ValueType::Integer)
//!     .field("person_id", ValueType::Integer)
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
//!         ("count", q.field("classes").count()),
//!     ]))
//!     .unwrap();
//! assert!(query.to_sql(&()).unwrap().text.contains("GROUP BY"));
//! ```

use std::sync::Arc;
use std::time::Instant;

use compact_str::CompactString;
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::accumulator::Accumulator;
use crate::assembler::Assembler;
use crate::compiler::{MappedProperty, compile_condition, compile_mapping};
use crate::driver::{AsyncExecutor, Executor};
use crate::element::ResolvedElement;
use crate::error::{Result, RowshapeError};
use crate::expr::Expr;
use crate::materialize::{MaterializePlan, Materializer};
use crate::params::ParamPool;
use crate::resolver::Resolver;
use crate::rowshape_log;
use crate::schema::{Cardinality, TableSchema};
use crate::settings::Settings;
use crate::sql::{RenderedSql, SQL};
use crate::statement::{JoinKind, SortDirection, Statement, TableId};

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    statement: Statement,
    joins: Vec<(TableId, Expr)>,
    filters: Vec<Expr>,
    order: Vec<(Expr, SortDirection)>,
    settings: Settings,
}

impl QueryBuilder {
    /// A query whose shape is the row of `table` itself: `q.name`.
    pub fn from(table: Arc<TableSchema>) -> Self {
        Self::from_as("", table)
    }

    /// A query whose shape has `table` as its member `path`: `q.person.name`.
    pub fn from_as(path: impl Into<CompactString>, table: Arc<TableSchema>) -> Self {
        Self {
            statement: Statement::new(path, table),
            joins: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    fn join(
        mut self,
        kind: JoinKind,
        path: impl Into<CompactString>,
        table: Arc<TableSchema>,
        cardinality: Cardinality,
        on: Expr,
    ) -> Self {
        let id = self.statement.add_table(path, table, cardinality, kind);
        self.joins.push((id, on));
        self
    }

    pub fn inner_join(
        self,
        path: impl Into<CompactString>,
        table: Arc<TableSchema>,
        cardinality: Cardinality,
        on: Expr,
    ) -> Self {
        self.join(JoinKind::Inner, path, table, cardinality, on)
    }

    /// Left joins whose columns the mapping never reads are dropped from the
    /// rendered statement.
    pub fn left_join(
        self,
        path: impl Into<CompactString>,
        table: Arc<TableSchema>,
        cardinality: Cardinality,
        on: Expr,
    ) -> Self {
        self.join(JoinKind::Left, path, table, cardinality, on)
    }

    /// Repeated filters are combined with `AND`.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn order_by(mut self, key: Expr) -> Self {
        self.order.push((key, SortDirection::Asc));
        self
    }

    pub fn order_by_desc(mut self, key: Expr) -> Self {
        self.order.push((key, SortDirection::Desc));
        self
    }

    pub fn skip(mut self, rows: u64) -> Self {
        self.statement.skip = Some(rows);
        self
    }

    pub fn take(mut self, rows: u64) -> Self {
        self.statement.take = Some(rows);
        self
    }

    /// Compiles `mapping` over the joined shape.
    pub fn map(self, mapping: &Expr) -> Result<CompiledQuery> {
        let started = Instant::now();
        let Self {
            mut statement,
            joins,
            filters,
            order,
            settings,
        } = self;
        let naming = &*settings.naming;
        let mut params = ParamPool::new();

        for (id, on) in &joins {
            let on = condition(on, &statement, &settings, &mut params)?;
            if let Some(later) = on
                .elements()
                .into_iter()
                .filter_map(ResolvedElement::column)
                .find(|c| c.table > *id)
            {
                let later = statement.table(later.table);
                return Err(RowshapeError::unsupported(
                    &statement.table(*id).path,
                    format!("the join condition reads `{}`, which is joined later", later.path),
                ));
            }
            statement.table_mut(*id).on = Some(on);
        }

        if let Some(predicate) = filters.into_iter().reduce(Expr::and) {
            statement.filter = Some(condition(&predicate, &statement, &settings, &mut params)?);
        }
        for (key, direction) in &order {
            let key = condition(key, &statement, &settings, &mut params)?;
            statement.order.push((key, *direction));
        }

        let compiled = compile_mapping(mapping, &statement, &mut params)?;
        let resolver = Resolver::new(&statement, naming, &compiled.bindings);
        let properties = compiled
            .properties
            .iter()
            .map(|p| {
                Ok(MappedProperty {
                    accumulator: resolver.resolve_accumulator(&p.accumulator)?,
                    target: p.target.clone(),
                    ty: p.ty,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let assembled = Assembler::new(&statement, &params, &*settings.syntax, &settings.temp_ids)
            .assemble(&properties, &compiled.tables)?;

        rowshape_log!(
            settings.logger,
            Info,
            CompileTime,
            "compiled `{mapping}` in {:?}",
            started.elapsed()
        );
        Ok(CompiledQuery {
            sql: assembled.sql,
            plan: assembled.plan,
            params,
            settings,
        })
    }
}

fn condition(
    expr: &Expr,
    statement: &Statement,
    settings: &Settings,
    params: &mut ParamPool,
) -> Result<Accumulator<ResolvedElement>> {
    let compiled = compile_condition(expr, statement, params)?;
    Resolver::new(statement, &*settings.naming, &compiled.bindings)
        .resolve_accumulator(&compiled.accumulator)
}

/// An immutable, re-executable query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    sql: SQL,
    plan: MaterializePlan,
    params: ParamPool,
    settings: Settings,
}

impl CompiledQuery {
    pub fn sql(&self) -> &SQL {
        &self.sql
    }

    pub fn plan(&self) -> &MaterializePlan {
        &self.plan
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Renders the statement for one execution, binding `args` into the
    /// parameters that depend on them.
    pub fn to_sql<A: Serialize + ?Sized>(&self, args: &A) -> Result<RenderedSql> {
        let args = serde_json::to_value(args)?;
        let bound = self.params.bind(&args)?;
        self.sql.render(self.settings.syntax.dialect(), &bound)
    }

    pub fn fetch_values<E, A>(&self, executor: &E, args: &A) -> Result<Vec<serde_json::Value>>
    where
        E: Executor + ?Sized,
        A: Serialize + ?Sized,
    {
        let rendered = self.to_sql(args)?;
        let logger = &*self.settings.logger;
        rowshape_log!(logger, Info, ExecutingQuery, "{}", rendered.text);

        let started = Instant::now();
        let mut reader = executor.query(&rendered.text, &rendered.params)?;
        rowshape_log!(logger, Info, ExecuteTime, "executed in {:?}", started.elapsed());

        let started = Instant::now();
        let mut materializer = Materializer::new(&self.plan, logger);
        let mut rows = 0usize;
        while let Some(row) = reader.next_row()? {
            materializer.push_row(&row)?;
            rows += 1;
        }
        let values = materializer.finish();
        rowshape_log!(
            logger,
            Info,
            ParseTime,
            "materialized {} values from {rows} rows in {:?}",
            values.len(),
            started.elapsed()
        );
        Ok(values)
    }

    pub fn fetch<T, E, A>(&self, executor: &E, args: &A) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        E: Executor + ?Sized,
        A: Serialize + ?Sized,
    {
        deserialize(self.fetch_values(executor, args)?)
    }

    pub async fn fetch_values_async<E, A>(
        &self,
        executor: &E,
        args: &A,
    ) -> Result<Vec<serde_json::Value>>
    where
        E: AsyncExecutor,
        A: Serialize + ?Sized,
    {
        let rendered = self.to_sql(args)?;
        let logger = &*self.settings.logger;
        rowshape_log!(logger, Info, ExecutingQuery, "{}", rendered.text);

        let started = Instant::now();
        let mut stream = executor.query(&rendered.text, &rendered.params).await?;
        rowshape_log!(logger, Info, ExecuteTime, "executed in {:?}", started.elapsed());

        let started = Instant::now();
        let mut materializer = Materializer::new(&self.plan, logger);
        let mut rows = 0usize;
        while let Some(row) = stream.next().await {
            materializer.push_row(&row?)?;
            rows += 1;
        }
        let values = materializer.finish();
        rowshape_log!(
            logger,
            Info,
            ParseTime,
            "materialized {} values from {rows} rows in {:?}",
            values.len(),
            started.elapsed()
        );
        Ok(values)
    }

    pub async fn fetch_async<T, E, A>(&self, executor: &E, args: &A) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        E: AsyncExecutor,
        A: Serialize + ?Sized,
    {
        deserialize(self.fetch_values_async(executor, args).await?)
    }
}

fn deserialize<T: DeserializeOwned>(values: Vec<serde_json::Value>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(RowshapeError::from))
        .collect()
}
