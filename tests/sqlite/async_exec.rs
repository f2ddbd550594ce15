use std::sync::Mutex;

use rowshape::core::{Row, RowStream};
use rowshape::prelude::*;
use rowshape::sqlite::SqliteConnection;
use serde::Deserialize;

use crate::common::{person, setup_db, with_joins};

/// Runs a synchronous connection behind the async contract.
struct Shared(Mutex<SqliteConnection>);

impl AsyncExecutor for Shared {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> impl Future<Output = Result<RowStream<'a>>> + Send + 'a {
        async move {
            let rows: Vec<Row> = {
                let db = self.0.lock().unwrap();
                let mut reader = Executor::query(&*db, sql, params)?;
                let mut rows = Vec::new();
                while let Some(row) = reader.next_row()? {
                    rows.push(row);
                }
                rows
            };
            let stream: RowStream<'a> = Box::pin(futures_util::stream::iter(rows.into_iter().map(Ok)));
            Ok(stream)
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    name: String,
    titles: Vec<String>,
}

#[tokio::test]
async fn async_fetch_materializes_in_arrival_order() {
    let db = Shared(Mutex::new(setup_db()));
    let q = Expr::row();
    let query = with_joins(QueryBuilder::from_as("person", person()))
        .with_settings(SqliteSyntax::new().settings())
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("titles", q.field("classes").select("c", |c| c.field("title"))),
        ]))
        .unwrap();

    let people: Vec<Person> = query.fetch_async(&db, &()).await.unwrap();
    assert_eq!(
        people,
        [
            Person {
                name: "John".into(),
                titles: vec!["Math".into(), "Art".into()],
            },
            Person {
                name: "Mary".into(),
                titles: vec!["Physics".into()],
            },
        ]
    );
}

#[tokio::test]
async fn one_query_runs_concurrently() {
    let db = Shared(Mutex::new(setup_db()));
    let q = Expr::row();
    let query = QueryBuilder::from(person())
        .with_settings(SqliteSyntax::new().settings())
        .filter(q.field("id").is_in(Expr::args().field("ids")))
        .map(&q.field("name"))
        .unwrap();

    let john = serde_json::json!({ "ids": [1] });
    let mary = serde_json::json!({ "ids": [2] });
    let (first, second) = tokio::join!(
        query.fetch_async::<String, _, _>(&db, &john),
        query.fetch_async::<String, _, _>(&db, &mary),
    );
    assert_eq!(first.unwrap(), ["John"]);
    assert_eq!(second.unwrap(), ["Mary"]);
}
