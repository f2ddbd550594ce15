use rowshape::prelude::*;

use crate::common::{address, person, setup_db, with_joins};

#[test]
fn unused_left_joins_leave_the_statement() {
    let db = setup_db();
    let q = Expr::row();
    let joined = with_joins(db.from_as("person", person()))
        .map(&q.field("person").field("name"))
        .unwrap();
    let plain = db
        .from_as("person", person())
        .map(&q.field("person").field("name"))
        .unwrap();

    let text = joined.to_sql(&()).unwrap().text;
    assert!(!text.contains(r#""class""#));
    assert!(!text.contains(r#""address""#));
    assert_eq!(text, plain.to_sql(&()).unwrap().text);

    let names: Vec<String> = joined.fetch(&db, &()).unwrap();
    assert_eq!(names, ["John", "Mary"]);
}

#[test]
fn inner_joins_filter_without_duplicating() {
    let db = setup_db();
    let q = Expr::row();
    let housed = db
        .from_as("person", person())
        .inner_join(
            "address",
            address(),
            Cardinality::One,
            q.field("address").field("person_id").eq(q.field("person").field("id")),
        )
        .map(&q.field("person").field("name"))
        .unwrap();
    let names: Vec<String> = housed.fetch(&db, &()).unwrap();
    assert_eq!(names, ["John"]);

    let enrolled = with_joins(db.from_as("person", person()))
        .filter(q.field("classes").field("title").ne(Expr::lit("Biology")))
        .map(&q.field("person").field("name"))
        .unwrap();
    let names: Vec<String> = enrolled.fetch(&db, &()).unwrap();
    assert_eq!(names, ["John", "Mary"]);
}
