use rowshape::prelude::*;
use serde_json::json;

use crate::common::{person, setup_db, with_joins};

fn first_class() -> Expr {
    let q = Expr::row();
    Expr::object([
        ("name", q.field("person").field("name")),
        (
            "class",
            q.field("classes")
                .select("c", |c| Expr::object([("title", c.field("title"))]))
                .one(),
        ),
    ])
}

#[test]
fn single_slots_reject_a_second_row() {
    let db = setup_db();
    let query = with_joins(db.from_as("person", person()))
        .map(&first_class())
        .unwrap();

    let err = query.fetch_values(&db, &()).unwrap_err();
    assert!(matches!(
        err,
        RowshapeError::CardinalityViolation { ref table, ref path, .. } if table == "class" && path == "class"
    ));
}

#[test]
fn single_slots_accept_exactly_one_row() {
    let db = setup_db();
    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .filter(q.field("person").field("id").eq(Expr::lit(2)))
        .map(&first_class())
        .unwrap();

    assert_eq!(
        query.fetch_values(&db, &()).unwrap(),
        vec![json!({ "name": "Mary", "class": { "title": "Physics" } })]
    );
}

#[test]
fn values_read_through_single_joins_are_checked() {
    let db = setup_db();
    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("city", q.field("address").field("city")),
        ]))
        .unwrap();

    assert_eq!(
        query.fetch_values(&db, &()).unwrap(),
        vec![
            json!({ "name": "John", "city": "Oslo" }),
            json!({ "name": "Mary", "city": null }),
        ]
    );

    db.execute_batch("INSERT INTO address (person_id, city) VALUES (2, 'Rome'), (2, 'Paris');")
        .unwrap();
    let err = query.fetch_values(&db, &()).unwrap_err();
    assert!(matches!(err, RowshapeError::CardinalityViolation { ref table, .. } if table == "address"));
}
