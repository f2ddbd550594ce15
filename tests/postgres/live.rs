use rowshape::postgres::PostgresClient;
use rowshape::prelude::*;
use serde::Deserialize;
use tokio_postgres::NoTls;

use crate::common::{person, with_joins};

#[derive(Debug, Deserialize, PartialEq)]
struct NameCount {
    name: String,
    count: i64,
}

async fn connect() -> PostgresClient {
    let url = std::env::var("ROWSHAPE_PG_URL").expect("ROWSHAPE_PG_URL is not set");
    let (client, connection) = tokio_postgres::connect(&url, NoTls)
        .await
        .expect("Failed to connect");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("connection error: {e}");
        }
    });

    let db = PostgresClient::new(client);
    db.batch_execute(
        "CREATE TEMP TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER NOT NULL);
         CREATE TEMP TABLE class (id INTEGER PRIMARY KEY, person_id INTEGER NOT NULL, title TEXT NOT NULL);
         CREATE TEMP TABLE address (person_id INTEGER NOT NULL, city TEXT NOT NULL);
         INSERT INTO person VALUES (1, 'John', 30), (2, 'Mary', 25);
         INSERT INTO class VALUES (1, 1, 'Math'), (2, 1, 'Art'), (3, 2, 'Physics');
         INSERT INTO address VALUES (1, 'Oslo');",
    )
    .await
    .expect("Failed to seed");
    db
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server at ROWSHAPE_PG_URL"]
async fn names_with_class_counts() {
    let db = connect().await;
    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .order_by(q.field("person").field("id"))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();

    let people: Vec<NameCount> = query.fetch_async(&db, &()).await.unwrap();
    assert_eq!(
        people,
        [
            NameCount {
                name: "John".into(),
                count: 2
            },
            NameCount {
                name: "Mary".into(),
                count: 1
            },
        ]
    );
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server at ROWSHAPE_PG_URL"]
async fn arguments_bind_at_the_inferred_width() {
    let db = connect().await;
    let q = Expr::row();
    let query = db
        .from(person())
        .order_by(q.field("id"))
        .map(&(q.field("id") + Expr::args().field("step")).eq(Expr::lit(2)))
        .unwrap();

    let flags: Vec<bool> = query
        .fetch_async(&db, &serde_json::json!({ "step": 1 }))
        .await
        .unwrap();
    assert_eq!(flags, [true, false]);
}
