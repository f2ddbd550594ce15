use rowshape::prelude::*;
use rowshape::sqlite::SqliteConnection;
use serde::Deserialize;

use crate::common::{person, setup_db, with_joins};

#[test]
fn unsupported_mappings_carry_breadcrumbs() {
    let q = Expr::row();
    let mapping = Expr::object([(
        "a",
        q.field("person").field("name").method("reverse", []) + Expr::lit(1),
    )]);
    let err = with_joins(QueryBuilder::from_as("person", person()))
        .map(&mapping)
        .unwrap_err();

    assert_eq!(err.breadcrumbs().len(), 2);
    assert!(matches!(
        err.root_cause(),
        RowshapeError::UnsupportedMapping { expr, .. } if expr == "q.person.name.reverse()"
    ));
    assert!(err.to_string().starts_with("Error compiling `{ a:"));
}

#[test]
fn only_count_folds_whole_tables() {
    let q = Expr::row();
    let err = with_joins(QueryBuilder::from_as("person", person()))
        .map(&Expr::object([("total", q.field("classes").sum())]))
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        RowshapeError::UnsupportedMapping { reason, .. } if reason.contains("count()")
    ));
}

#[test]
fn driver_errors_pass_through() {
    let db = SqliteConnection::open_in_memory().unwrap();
    db.execute_batch("CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT, age INTEGER);")
        .unwrap();

    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();
    let err = query.fetch_values(&db, &()).unwrap_err();
    assert!(matches!(err, RowshapeError::Rusqlite(_)));
}

#[test]
fn mismatched_result_types_are_conversion_errors() {
    #[derive(Debug, Deserialize)]
    struct Wrong {
        #[allow(dead_code)]
        name: i64,
    }

    let db = setup_db();
    let q = Expr::row();
    let query = db
        .from(person())
        .map(&Expr::object([("name", q.field("name"))]))
        .unwrap();
    let err = query.fetch::<Wrong, _, _>(&db, &()).unwrap_err();
    assert!(matches!(err, RowshapeError::Conversion(_)));
}

#[test]
fn missing_arguments_are_parameter_errors() {
    let db = setup_db();
    let q = Expr::row();
    let query = db
        .from(person())
        .filter(q.field("age").gt(Expr::args().field("min")))
        .map(&q.field("name"))
        .unwrap();
    let err = query.fetch_values(&db, &()).unwrap_err();
    assert!(matches!(err, RowshapeError::Parameter(_)));
}
