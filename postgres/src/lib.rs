//! PostgreSQL dialect for rowshape
//!
//! [`PostgresSyntax`] renders compiled mappings with numbered placeholders.
//! With the `tokio-postgres` feature, [`PostgresClient`] runs them against a
//! [`::tokio_postgres::Client`].

#[cfg(feature = "tokio-postgres")]
mod tokio_postgres;

#[cfg(feature = "tokio-postgres")]
pub use tokio_postgres::{PgParam, PostgresClient};

use rowshape_core::{AggregateFunction, Dialect, SQL, Settings, SqlSyntax, Token};

/// PostgreSQL rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostgresSyntax;

impl PostgresSyntax {
    pub fn settings(self) -> Settings {
        Settings::new(self)
    }
}

impl SqlSyntax for PostgresSyntax {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
    }

    // SUM and AVG over integers yield NUMERIC, which rows only carry as
    // integers or doubles.
    fn aggregate(&self, function: AggregateFunction, operand: SQL, distinct: bool) -> SQL {
        let operand = if distinct {
            SQL::token(Token::DISTINCT).append(operand)
        } else {
            operand
        };
        let call = SQL::func(function.sql_name(), operand);
        match function {
            AggregateFunction::Sum | AggregateFunction::Avg => {
                SQL::func("CAST", call.push(Token::AS).append(SQL::raw("DOUBLE PRECISION")))
            }
            _ => call,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rowshape_core::{Cardinality, Expr, QueryBuilder, TableSchema, ValueType};
    use serde_json::json;

    use super::*;

    fn person() -> Arc<TableSchema> {
        TableSchema::new("person")
            .field("id", ValueType::Integer)
            .field("name", ValueType::Text)
            .field("age", ValueType::Integer)
            .shared()
    }

    fn class() -> Arc<TableSchema> {
        TableSchema::new("class")
            .field("person_id", ValueType::Integer)
            .field("credits", ValueType::Integer)
            .shared()
    }

    fn shape() -> QueryBuilder {
        let q = Expr::row();
        QueryBuilder::from_as("person", person())
            .with_settings(PostgresSyntax.settings())
            .left_join(
                "classes",
                class(),
                Cardinality::Many,
                q.field("classes").field("person_id").eq(q.field("person").field("id")),
            )
    }

    #[test]
    fn numbered_placeholders() {
        let q = Expr::row();
        let query = shape()
            .filter(q.field("person").field("age").ge(Expr::args().field("min")))
            .filter(q.field("person").field("name").ne(Expr::lit("root")))
            .map(&q.field("person").field("name"))
            .unwrap();

        let rendered = query.to_sql(&json!({ "min": 21 })).unwrap();
        assert!(rendered.text.contains(r#"WHERE ("t0"."age" >= $1) AND ("t0"."name" <> $2)"#));
        assert_eq!(
            rendered.params,
            [rowshape_core::Value::Integer(21), rowshape_core::Value::Text("root".into())]
        );
    }

    #[test]
    fn membership_expands_into_numbered_placeholders() {
        let q = Expr::row();
        let query = shape()
            .filter(q.field("person").field("id").is_in(Expr::args().field("ids")))
            .map(&q.field("person").field("name"))
            .unwrap();

        let rendered = query.to_sql(&json!({ "ids": [3, 4, 5] })).unwrap();
        assert!(rendered.text.contains(r#""t0"."id" IN ($1, $2, $3)"#));

        let empty = query.to_sql(&json!({ "ids": [] })).unwrap();
        assert!(empty.text.contains("WHERE 1 = 0"));
        assert!(empty.params.is_empty());
    }

    #[test]
    fn sums_are_cast_to_doubles() {
        let q = Expr::row();
        let query = shape()
            .map(&Expr::object([
                ("name", q.field("person").field("name")),
                ("credits", q.field("classes").select("c", |c| c.field("credits")).sum()),
                ("classes", q.field("classes").count()),
            ]))
            .unwrap();

        let text = query.to_sql(&()).unwrap().text;
        assert!(text.contains(r#"CAST(SUM("t1"."credits") AS DOUBLE PRECISION) AS "credits""#));
        assert!(text.contains(r###"COUNT(DISTINCT "t1"."##rowid") AS "classes""###));
    }

    #[test]
    fn offset_without_limit() {
        let q = Expr::row();
        let text = shape()
            .skip(2)
            .map(&q.field("person").field("name"))
            .unwrap()
            .to_sql(&())
            .unwrap()
            .text;
        assert!(text.ends_with(r###"ORDER BY "t0"."##rowid" OFFSET 2"###));
    }
}
