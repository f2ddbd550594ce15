use rowshape::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::common::{class, person, setup_db, with_joins};

#[derive(Debug, Deserialize, PartialEq)]
struct NameCount {
    name: String,
    count: i64,
}

#[test]
fn one_to_many_rows_fold_into_collections() {
    let db = setup_db();
    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            (
                "classes",
                q.field("classes")
                    .select("c", |c| Expr::object([("title", c.field("title"))])),
            ),
        ]))
        .unwrap();

    assert_eq!(
        query.fetch_values(&db, &()).unwrap(),
        vec![
            json!({ "name": "John", "classes": [{ "title": "Math" }, { "title": "Art" }] }),
            json!({ "name": "Mary", "classes": [{ "title": "Physics" }] }),
        ]
    );
}

#[test]
fn sibling_collections_do_not_multiply() {
    let db = setup_db();
    let q = Expr::row();
    // joining class twice repeats every (person, class) pair per sibling row
    let query = db
        .from_as("person", person())
        .left_join(
            "classes",
            class(),
            Cardinality::Many,
            q.field("classes").field("person_id").eq(q.field("person").field("id")),
        )
        .left_join(
            "again",
            class(),
            Cardinality::Many,
            q.field("again").field("person_id").eq(q.field("person").field("id")),
        )
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("classes", q.field("classes").select("c", |c| c.field("title"))),
            ("again", q.field("again").select("c", |c| c.field("id"))),
        ]))
        .unwrap();

    assert_eq!(
        query.fetch_values(&db, &()).unwrap(),
        vec![
            json!({ "name": "John", "classes": ["Math", "Art"], "again": [1, 2] }),
            json!({ "name": "Mary", "classes": ["Physics"], "again": [3] }),
        ]
    );
}

#[test]
fn aggregates_next_to_a_sibling_join_count_each_row_once() {
    let db = setup_db();
    let q = Expr::row();
    let query = db
        .from_as("person", person())
        .left_join(
            "classes",
            class(),
            Cardinality::Many,
            q.field("classes").field("person_id").eq(q.field("person").field("id")),
        )
        .left_join(
            "again",
            class(),
            Cardinality::Many,
            q.field("again").field("person_id").eq(q.field("person").field("id")),
        )
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("total", q.field("classes").select("c", |c| c.field("id")).sum()),
            ("ids", q.field("classes").select("c", |c| c.field("id")).count()),
            ("mean", q.field("classes").select("c", |c| c.field("id")).avg()),
            ("top", q.field("classes").select("c", |c| c.field("id")).max()),
            ("n", q.field("again").count()),
        ]))
        .unwrap();

    assert_eq!(
        query.fetch_values(&db, &()).unwrap(),
        vec![
            json!({ "name": "John", "total": 3, "ids": 2, "mean": 1.5, "top": 2, "n": 2 }),
            json!({ "name": "Mary", "total": 3, "ids": 1, "mean": 3.0, "top": 3, "n": 1 }),
        ]
    );
}

#[test]
fn names_with_class_counts() {
    let db = setup_db();
    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();

    let people: Vec<NameCount> = query.fetch(&db, &()).unwrap();
    assert_eq!(
        people,
        vec![
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

#[test]
fn arithmetic_keeps_its_precedence() {
    let db = setup_db();
    let q = Expr::row();
    let query = db
        .from(person())
        .map(&(q.field("id") + Expr::lit(1)).eq(Expr::lit(2)))
        .unwrap();

    let flags: Vec<bool> = query.fetch(&db, &()).unwrap();
    assert_eq!(flags, [true, false]);
}

#[test]
fn single_tables_become_objects_or_null() {
    let db = setup_db();
    let q = Expr::row();
    let query = with_joins(db.from_as("person", person()))
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("address", q.field("address")),
        ]))
        .unwrap();

    let values = query.fetch_values(&db, &()).unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0]["address"]["city"], json!("Oslo"));
    assert_eq!(values[1]["address"], json!(null));
}

#[test]
fn scalar_collections_and_first_elements() {
    let db = setup_db();
    let q = Expr::row();
    let titles = with_joins(db.from_as("person", person()))
        .map(&Expr::object([(
            "titles",
            q.field("classes").select("c", |c| c.field("title")),
        )]))
        .unwrap();
    assert_eq!(
        titles.fetch_values(&db, &()).unwrap(),
        vec![
            json!({ "titles": ["Math", "Art"] }),
            json!({ "titles": ["Physics"] }),
        ]
    );

    let first = with_joins(db.from_as("person", person()))
        .filter(q.field("person").field("name").eq(Expr::lit("Mary")))
        .map(&Expr::object([(
            "class",
            q.field("classes")
                .select("c", |c| Expr::object([("title", c.field("title"))]))
                .one(),
        )]))
        .unwrap();
    assert_eq!(
        first.fetch_values(&db, &()).unwrap(),
        vec![json!({ "class": { "title": "Physics" } })]
    );
}

#[test]
fn arguments_are_bound_per_execution() {
    let db = setup_db();
    let q = Expr::row();
    let query = db
        .from(person())
        .filter(q.field("age").ge(Expr::args().field("min_age")))
        .map(&q.field("name"))
        .unwrap();

    let adults: Vec<String> = query.fetch(&db, &json!({ "min_age": 26 })).unwrap();
    assert_eq!(adults, ["John"]);
    let everyone: Vec<String> = query.fetch(&db, &json!({ "min_age": 0 })).unwrap();
    assert_eq!(everyone, ["John", "Mary"]);
}

#[test]
fn ordering_and_paging() {
    let db = setup_db();
    let q = Expr::row();
    let by_name = db
        .from(person())
        .order_by_desc(q.field("name"))
        .take(1)
        .map(&q.field("name"))
        .unwrap();
    let names: Vec<String> = by_name.fetch(&db, &()).unwrap();
    assert_eq!(names, ["Mary"]);

    let rest = db.from(person()).skip(1).map(&q.field("name")).unwrap();
    let names: Vec<String> = rest.fetch(&db, &()).unwrap();
    assert_eq!(names, ["Mary"]);
}

#[test]
fn compiled_queries_run_from_many_threads() {
    let q = Expr::row();
    let query = with_joins(QueryBuilder::from_as("person", person()))
        .with_settings(SqliteSyntax::new().settings())
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let db = setup_db();
                    query.fetch::<NameCount, _, _>(&db, &()).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), 2);
        }
    });
}
