use std::sync::Arc;

use rowshape::prelude::*;
use serde_json::json;

use crate::common::{CaptureLogger, person, setup_db, with_joins};

#[test]
fn every_phase_reports_its_code() {
    let logger = Arc::new(CaptureLogger::default());
    let db = setup_db().with_settings(SqliteSyntax::new().settings().with_logger(logger.clone()));

    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();
    query.fetch_values(&db, &()).unwrap();

    assert_eq!(
        logger.codes(),
        [
            LogCode::CompileTime,
            LogCode::ExecutingQuery,
            LogCode::ExecuteTime,
            LogCode::ObjectGraphNodeAllocated,
            LogCode::ObjectGraphNodeAllocated,
            LogCode::ParseTime,
        ]
    );
    assert_eq!(
        logger.messages(LogCode::ExecutingQuery),
        [query.to_sql(&()).unwrap().text]
    );
}

#[test]
fn blobs_read_as_text_warn_once_per_column() {
    let logger = Arc::new(CaptureLogger::default());
    let db = setup_db().with_settings(SqliteSyntax::new().settings().with_logger(logger.clone()));
    db.execute_batch(
        "CREATE TABLE note (body BLOB NOT NULL);
         INSERT INTO note VALUES (X'6869'), (X'796f');",
    )
    .unwrap();

    let note = TableSchema::new("note").field("body", ValueType::Text).shared();
    let q = Expr::row();
    let query = db.from(note).map(&Expr::object([("body", q.field("body"))])).unwrap();

    assert_eq!(
        query.fetch_values(&db, &()).unwrap(),
        vec![json!({ "body": "hi" }), json!({ "body": "yo" })]
    );
    let warnings = logger
        .codes()
        .into_iter()
        .filter(|c| *c == LogCode::InefficientCollectionConversion)
        .count();
    assert_eq!(warnings, 1);
}

#[test]
fn codes_are_stable_numbers() {
    assert_eq!(LogCode::CompileTime.code(), 1000);
    assert_eq!(LogCode::ExecutingQuery.code(), 1001);
    assert_eq!(LogCode::ExecuteTime.code(), 1002);
    assert_eq!(LogCode::ParseTime.code(), 1003);
    assert_eq!(LogCode::ObjectGraphNodeAllocated.code(), 1004);
    assert_eq!(LogCode::InefficientCollectionConversion.code(), 2000);
}
