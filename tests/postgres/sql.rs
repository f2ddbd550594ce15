use rowshape::postgres::PostgresSyntax;
use rowshape::prelude::*;
use serde_json::json;

use crate::common::{person, with_joins};

const PERSON: &str = r###"(SELECT ROW_NUMBER() OVER () AS "##rowid", * FROM "person") AS "t0""###;
const CLASS: &str = r###"(SELECT ROW_NUMBER() OVER () AS "##rowid", * FROM "class") AS "t1""###;

fn people() -> QueryBuilder {
    with_joins(QueryBuilder::from_as("person", person())).with_settings(PostgresSyntax.settings())
}

#[test]
fn grouped_counts() {
    let q = Expr::row();
    let query = people()
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();

    assert_eq!(
        query.to_sql(&()).unwrap().text,
        format!(
            r###"SELECT "t0"."name" AS "name", COUNT(DISTINCT "t1"."##rowid") AS "count", "t0"."##rowid" AS "t0.##rowid" FROM {PERSON} LEFT JOIN {CLASS} ON "t1"."person_id" = "t0"."id" GROUP BY "t0"."name", "t0"."##rowid" ORDER BY "t0"."##rowid""###
        )
    );
}

#[test]
fn arithmetic_comparisons_number_their_placeholders() {
    let q = Expr::row();
    let query = people()
        .map(&(q.field("person").field("id") + Expr::lit(1)).eq(Expr::lit(2)))
        .unwrap();

    let rendered = query.to_sql(&()).unwrap();
    assert!(rendered.text.starts_with(r###"SELECT ("t0"."id" + $1) = $2 AS "##self""###));
    assert_eq!(rendered.params, [Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn collections_order_by_every_level() {
    let q = Expr::row();
    let query = people()
        .order_by(q.field("person").field("age"))
        .take(5)
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("titles", q.field("classes").select("c", |c| c.field("title"))),
        ]))
        .unwrap();

    let text = query.to_sql(&()).unwrap().text;
    assert!(text.ends_with(r###"ORDER BY "t0"."age" ASC, "t0"."##rowid", "t1"."##rowid" LIMIT 5"###));
    assert!(!text.contains("GROUP BY"));
}

#[test]
fn membership_renumbers_after_expansion() {
    let q = Expr::row();
    let query = people()
        .filter(q.field("person").field("id").is_in(Expr::args().field("ids")))
        .filter(q.field("person").field("age").gt(Expr::args().field("age")))
        .map(&q.field("person").field("name"))
        .unwrap();

    let rendered = query.to_sql(&json!({ "ids": [4, 5], "age": 18 })).unwrap();
    assert!(rendered.text.contains(r#"WHERE ("t0"."id" IN ($1, $2)) AND ("t0"."age" > $3)"#));
    assert_eq!(
        rendered.params,
        [Value::Integer(4), Value::Integer(5), Value::Integer(18)]
    );
}
