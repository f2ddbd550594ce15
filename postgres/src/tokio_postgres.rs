use std::error::Error;
use std::ops::Deref;
use std::sync::Arc;

use ::tokio_postgres::{Client, Row as PgRow};
use bytes::BytesMut;
use compact_str::CompactString;
use futures_util::stream;
use postgres_types::{IsNull, ToSql, Type, to_sql_checked};
use rowshape_core::{
    AsyncExecutor, QueryBuilder, Result, Row, RowStream, RowshapeError, Settings, TableSchema,
    Value,
};
use smallvec::SmallVec;

use crate::PostgresSyntax;

/// Async PostgreSQL executor over a [`tokio_postgres::Client`].
///
/// The connection half returned by `tokio_postgres::connect` must be driven
/// by the caller, as usual.
#[derive(Debug)]
pub struct PostgresClient {
    client: Client,
    settings: Settings,
}

impl PostgresClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            settings: PostgresSyntax.settings(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_inner(self) -> Client {
        self.client
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

impl Deref for PostgresClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

impl AsyncExecutor for PostgresClient {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> impl Future<Output = Result<RowStream<'a>>> + Send + 'a {
        async move {
            tracing::debug!(sql = %sql, params = params.len(), "rowshape.query");

            let params: SmallVec<[PgParam<'_>; 8]> = params.iter().map(PgParam).collect();
            let refs: SmallVec<[&(dyn ToSql + Sync); 8]> =
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
            let rows = self
                .client
                .query(sql, &refs[..])
                .await
                .map_err(RowshapeError::driver)?;

            let columns: Arc<[CompactString]> = match rows.first() {
                Some(row) => row.columns().iter().map(|c| CompactString::from(c.name())).collect(),
                None => Arc::from(Vec::new()),
            };
            let decoded = rows.into_iter().map(move |row| decode(&columns, &row));
            Ok(Box::pin(stream::iter(decoded)) as RowStream<'a>)
        }
    }
}

fn decode(columns: &Arc<[CompactString]>, row: &PgRow) -> Result<Row> {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| cell(row, i, column.type_(), column.name()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Row::new(Arc::clone(columns), values))
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>>
where
    T: postgres_types::FromSql<'r>,
{
    row.try_get::<_, Option<T>>(index)
        .map_err(RowshapeError::driver)
}

fn cell(row: &PgRow, index: usize, ty: &Type, name: &str) -> Result<Value> {
    let value = if *ty == Type::BOOL {
        get::<bool>(row, index)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        get::<i16>(row, index)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::INT4 {
        get::<i32>(row, index)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::INT8 {
        get::<i64>(row, index)?.map(Value::Integer)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, index)?.map(|v| Value::Real(v.into()))
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, index)?.map(Value::Real)
    } else if *ty == Type::BYTEA {
        get::<Vec<u8>>(row, index)?.map(Value::Blob)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME, Type::UNKNOWN].contains(ty) {
        get::<String>(row, index)?.map(Value::Text)
    } else {
        return Err(RowshapeError::Conversion(format!(
            "column `{name}` has type `{ty}`, which rows cannot carry"
        )));
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Binds a [`Value`] as whatever type the server inferred for its placeholder.
#[derive(Debug, Clone, Copy)]
pub struct PgParam<'a>(pub &'a Value);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Integer(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*i as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*i as f64).to_sql(ty, out)
                } else if *ty == Type::BOOL {
                    (*i != 0).to_sql(ty, out)
                } else {
                    i.to_sql(ty, out)
                }
            }
            Value::Real(f) => {
                if *ty == Type::FLOAT4 {
                    (*f as f32).to_sql(ty, out)
                } else {
                    f.to_sql(ty, out)
                }
            }
            Value::Text(s) => s.as_str().to_sql(ty, out),
            Value::Blob(b) => b.as_slice().to_sql(ty, out),
            Value::List(_) => Err("list parameters must be expanded before binding".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
