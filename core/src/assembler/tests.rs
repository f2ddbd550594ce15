use std::sync::Arc;

use super::*;
use crate::dialect::Dialect;
use crate::expr::{Expr, UnaryOp};
use crate::materialize::Witness;
use crate::query::{CompiledQuery, QueryBuilder};
use crate::schema::{Cardinality, TableSchema};
use crate::settings::Settings;
use crate::syntax::{AnsiSyntax, RowIdStrategy};
use crate::target::Segment;
use crate::value::ValueType;

fn person() -> Arc<TableSchema> {
    TableSchema::new("person")
        .field("id", ValueType::Integer)
        .field("name", ValueType::Text)
        .field("age", ValueType::Integer)
        .shared()
}

fn class() -> Arc<TableSchema> {
    TableSchema::new("class")
        .field("id", ValueType::Integer)
        .field("person_id", ValueType::Integer)
        .field("title", ValueType::Text)
        .shared()
}

fn address() -> Arc<TableSchema> {
    TableSchema::new("address")
        .field("person_id", ValueType::Integer)
        .field("city", ValueType::Text)
        .shared()
}

fn shape() -> QueryBuilder {
    let q = Expr::row();
    QueryBuilder::from_as("person", person())
        .left_join(
            "classes",
            class(),
            Cardinality::Many,
            q.field("classes").field("person_id").eq(q.field("person").field("id")),
        )
        .left_join(
            "address",
            address(),
            Cardinality::One,
            q.field("address").field("person_id").eq(q.field("person").field("id")),
        )
}

fn sql(query: &CompiledQuery) -> String {
    query.to_sql(&()).unwrap().text
}

fn field(name: &str) -> TargetPath {
    [Segment::Field(name.into())].into_iter().collect()
}

#[test]
fn single_tables_become_single_levels() {
    let q = Expr::row();
    let query = shape()
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("address", q.field("address")),
        ]))
        .unwrap();

    let plan = query.plan();
    assert_eq!(plan.levels.len(), 2);
    assert!(plan.levels[1].single);
    assert_eq!(plan.levels[1].target, field("address"));
    assert_eq!(plan.levels[1].table, "address");

    let city = plan.columns.iter().find(|c| c.alias == "address.city").unwrap();
    assert_eq!((city.level, &city.target), (1, &field("city")));

    let text = sql(&query);
    assert!(text.contains(r#""t2"."city" AS "address.city""#));
    assert!(text.contains(r###"LEFT JOIN (SELECT ROW_NUMBER() OVER () AS "##rowid", * FROM "address") AS "t2" ON "t2"."person_id" = "t0"."id""###));
    assert!(!text.contains(r#""class""#));
}

#[test]
fn values_read_from_unmapped_tables_get_witnesses() {
    let q = Expr::row();
    let query = shape()
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("city", q.field("address").field("city")),
        ]))
        .unwrap();

    let plan = query.plan();
    assert_eq!(plan.levels.len(), 1);
    assert_eq!(
        plan.levels[0].witnesses,
        vec![Witness {
            row_id: 1,
            table: "address".into(),
        }]
    );
    assert!(sql(&query).contains(r###""t2"."##rowid" AS "t2.##rowid""###));
}

#[test]
fn scalar_selects_and_one() {
    let q = Expr::row();
    let titles = shape()
        .map(&Expr::object([(
            "titles",
            q.field("classes").select("c", |c| c.field("title")),
        )]))
        .unwrap();
    let plan = titles.plan();
    assert_eq!(plan.levels[1].target, field("titles"));
    assert!(plan.columns[0].target.is_root());
    assert_eq!(plan.columns[0].level, 1);

    let first = shape()
        .map(&Expr::object([(
            "class",
            q.field("classes")
                .select("c", |c| Expr::object([("title", c.field("title"))]))
                .one(),
        )]))
        .unwrap();
    assert!(first.plan().levels[1].single);
}

#[test]
fn case_function_and_negation_rendering() {
    let q = Expr::row();
    let adult = q.field("person").field("age").ge(Expr::lit(18));
    let query = QueryBuilder::from_as("person", person())
        .map(&Expr::object([
            ("loud", q.field("person").field("name").upper()),
            (
                "minor",
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(adult.clone()),
                },
            ),
            ("kind", Expr::cond(adult, Expr::lit("adult"), Expr::lit("minor"))),
        ]))
        .unwrap();

    let text = sql(&query);
    assert!(text.contains(r#"UPPER("t0"."name") AS "loud""#));
    assert!(text.contains(r#"NOT ("t0"."age" >= ?) AS "minor""#));
    assert!(text.contains(r#"CASE WHEN "t0"."age" >= ? THEN ? ELSE ? END AS "kind""#));
}

#[derive(Debug)]
struct Emulating;

impl SqlSyntax for Emulating {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn row_id_strategy(&self) -> RowIdStrategy {
        RowIdStrategy::Emulated("rowid".into())
    }
}

#[test]
fn emulated_row_ids_draw_from_the_settings_sequence() {
    let q = Expr::row();
    let settings = Settings::new(Emulating);
    let temp_ids = Arc::clone(&settings.temp_ids);
    let query = shape()
        .with_settings(settings)
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("count", q.field("classes").count()),
        ]))
        .unwrap();

    let text = sql(&query);
    assert!(text.contains(r#"FROM "person" AS "rs_tmp_1""#));
    assert!(text.contains(r#"FROM "class" AS "rs_tmp_2""#));
    assert_eq!(temp_ids.next_id(), 3);
}

#[test]
fn joins_without_conditions_are_invariant_violations() {
    let mut statement = Statement::new("person", person());
    let classes = statement.add_table("classes", class(), Cardinality::Many, JoinKind::Left);
    let title = ResolvedElement::Column {
        column: ColumnRef {
            table: classes,
            table_alias: "t1".into(),
            column: "title".into(),
        },
        row_id: ColumnRef::row_id(classes, "t1"),
        function: None,
        ty: ValueType::Text,
    };
    let properties = [MappedProperty {
        accumulator: Accumulator::leaf(title),
        target: field("title"),
        ty: ValueType::Text,
    }];

    let params = ParamPool::new();
    let temp_ids = TempIdSequence::new();
    let err = Assembler::new(&statement, &params, &AnsiSyntax, &temp_ids)
        .assemble(&properties, &[])
        .unwrap_err();
    assert!(matches!(err, RowshapeError::InvariantViolation(_)));
}

fn with_sibling(query: QueryBuilder) -> QueryBuilder {
    let q = Expr::row();
    query.left_join(
        "again",
        class(),
        Cardinality::Many,
        q.field("again").field("person_id").eq(q.field("person").field("id")),
    )
}

#[test]
fn sums_beside_a_sibling_join_read_first_rows_only() {
    let q = Expr::row();
    let query = with_sibling(shape())
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("total", q.field("classes").select("c", |c| c.field("id")).sum()),
            ("top", q.field("classes").select("c", |c| c.field("id")).max()),
            ("n", q.field("again").count()),
        ]))
        .unwrap();

    let text = sql(&query);
    assert!(text.starts_with(
        r###"SELECT "##rows"."t0.name" AS "name", SUM(CASE WHEN "##rows"."##d0" = 1 THEN "##rows"."t1.id" END) AS "total", MAX("##rows"."t1.id") AS "top", COUNT(DISTINCT "##rows"."t3.##rowid") AS "n", "##rows"."t0.##rowid" AS "t0.##rowid" FROM (SELECT "t0"."name" AS "t0.name", "t1"."id" AS "t1.id""###
    ));
    assert!(text.contains(
        r###"ROW_NUMBER() OVER (PARTITION BY "t0"."name", "t0"."##rowid", "t1"."##rowid") AS "##d0" FROM"###
    ));
    assert!(text.ends_with(
        r###") AS "##rows" GROUP BY "##rows"."t0.name", "##rows"."t0.##rowid" ORDER BY "##rows"."t0.##rowid""###
    ));
}

#[test]
fn aggregates_without_a_multiplying_join_stay_flat() {
    let q = Expr::row();
    let query = shape()
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("total", q.field("classes").select("c", |c| c.field("id")).sum()),
            ("city", q.field("address").field("city")),
        ]))
        .unwrap();

    let text = sql(&query);
    assert!(text.contains(r#"SUM("t1"."id") AS "total""#));
    assert!(!text.contains(DERIVED_ALIAS));
}

#[test]
fn tables_read_both_aggregated_and_row_by_row_are_rejected() {
    let q = Expr::row();
    let err = shape()
        .map(&Expr::object([
            ("n", q.field("classes").count()),
            ("titles", q.field("classes").select("c", |c| c.field("title"))),
        ]))
        .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        RowshapeError::UnsupportedMapping { reason, .. }
            if reason.contains("used both inside an aggregate and row by row")
    ));
}

#[test]
fn aggregated_tables_may_sit_beside_row_level_reads_of_other_tables() {
    let q = Expr::row();
    let query = shape()
        .map(&Expr::object([
            ("name", q.field("person").field("name")),
            ("city", q.field("address").field("city")),
            ("n", q.field("classes").count()),
            ("last", q.field("classes").select("c", |c| c.field("title")).max()),
        ]))
        .unwrap();

    let text = sql(&query);
    assert!(text.contains(r#"MAX("t1"."title") AS "last""#));
    assert!(text.contains(r###"GROUP BY "t0"."name", "t2"."city", "t0"."##rowid", "t2"."##rowid""###));
}
