use rowshape::prelude::*;
use serde_json::json;

use crate::common::{person, setup_db};

fn names_in() -> CompiledQuery {
    let q = Expr::row();
    QueryBuilder::from(person())
        .with_settings(SqliteSyntax::new().settings())
        .filter(q.field("id").is_in(Expr::args().field("ids")))
        .map(&q.field("name"))
        .unwrap()
}

#[test]
fn argument_lists_select_their_members() {
    let db = setup_db();
    let query = names_in();

    let names: Vec<String> = query.fetch(&db, &json!({ "ids": [2] })).unwrap();
    assert_eq!(names, ["Mary"]);
    let names: Vec<String> = query.fetch(&db, &json!({ "ids": [1, 2, 99] })).unwrap();
    assert_eq!(names, ["John", "Mary"]);
}

#[test]
fn empty_lists_match_nothing() {
    let db = setup_db();
    let names: Vec<String> = names_in().fetch(&db, &json!({ "ids": [] })).unwrap();
    assert!(names.is_empty());
}

#[test]
fn literal_arrays_and_contains() {
    let db = setup_db();
    let q = Expr::row();
    let literal = db
        .from(person())
        .filter(q.field("id").is_in(Expr::array([Expr::lit(1)])))
        .map(&q.field("name"))
        .unwrap();
    let names: Vec<String> = literal.fetch(&db, &()).unwrap();
    assert_eq!(names, ["John"]);

    let contains = db
        .from(person())
        .filter(Expr::args().field("names").contains(q.field("name")))
        .map(&q.field("id"))
        .unwrap();
    let ids: Vec<i64> = contains.fetch(&db, &json!({ "names": ["Mary"] })).unwrap();
    assert_eq!(ids, [2]);
}

#[test]
fn row_data_cannot_be_a_membership_set() {
    let q = Expr::row();
    let err = QueryBuilder::from(person())
        .filter(q.field("id").is_in(q.field("age")))
        .map(&q.field("name"))
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        RowshapeError::MembershipOperand { .. }
    ));
}

#[test]
fn non_list_arguments_are_rejected() {
    let db = setup_db();
    let err = names_in().fetch_values(&db, &json!({ "ids": 3 })).unwrap_err();
    assert!(matches!(err, RowshapeError::Parameter(_)));
}
