//! The dialect syntax contract consumed by the assembler.

use core::fmt;

use compact_str::{CompactString, format_compact};

use crate::accumulator::UnaryOperator;
use crate::dialect::Dialect;
use crate::expr::{AggregateFunction, BinaryOp, ScalarFunction};
use crate::settings::TempIdSequence;
use crate::sql::{SQL, SQLChunk, Token};

/// Name of the synthetic per-table row identity column.
pub const ROW_ID: &str = "##rowid";

/// How a table subquery numbers its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIdStrategy {
    /// `ROW_NUMBER() OVER ()`
    Window,
    /// A column the engine already maintains, e.g. SQLite's `rowid`
    Native(CompactString),
    /// For engines without window functions: a correlated `COUNT(*)` over
    /// the native key, through a temporary alias
    Emulated(CompactString),
}

/// Pure functions producing dialect-specific SQL.
///
/// Every method has a default matching ANSI SQL; dialects override what
/// differs.
pub trait SqlSyntax: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    fn row_id_strategy(&self) -> RowIdStrategy {
        RowIdStrategy::Window
    }

    /// Renders `table` with a leading row-id column, aliased as `alias`.
    fn table_source(&self, table: &str, alias: &str, temp_ids: &TempIdSequence) -> SQL {
        let row_id = match self.row_id_strategy() {
            RowIdStrategy::Window => SQL::func("ROW_NUMBER", SQL::empty())
                .push(Token::OVER)
                .append(SQL::token(Token::LPAREN).push(Token::RPAREN)),
            RowIdStrategy::Native(column) => SQL::ident(column),
            RowIdStrategy::Emulated(key) => {
                let temp = temp_ids.next_alias();
                SQL::token(Token::SELECT)
                    .append(SQL::func("COUNT", SQL::token(Token::STAR)))
                    .push(Token::FROM)
                    .append(SQL::ident(table).alias(temp.clone()))
                    .push(Token::WHERE)
                    .append(SQL::qualified(temp, key.clone()))
                    .push(SQLChunk::raw_static("<="))
                    .append(SQL::qualified(table, key))
                    .parens()
            }
        };
        SQL::token(Token::SELECT)
            .append(row_id.alias(ROW_ID))
            .push(Token::COMMA)
            .push(Token::STAR)
            .push(Token::FROM)
            .append(SQL::ident(table))
            .parens()
            .alias(alias)
    }

    fn binary_operator(&self, op: BinaryOp) -> SQLChunk {
        match op {
            BinaryOp::Add => SQLChunk::raw_static("+"),
            BinaryOp::Subtract => SQLChunk::raw_static("-"),
            BinaryOp::Multiply => SQLChunk::raw_static("*"),
            BinaryOp::Divide => SQLChunk::raw_static("/"),
            BinaryOp::Modulo => SQLChunk::raw_static("%"),
            BinaryOp::Equal => SQLChunk::raw_static("="),
            BinaryOp::NotEqual => SQLChunk::raw_static("<>"),
            BinaryOp::Less => SQLChunk::raw_static("<"),
            BinaryOp::LessOrEqual => SQLChunk::raw_static("<="),
            BinaryOp::Greater => SQLChunk::raw_static(">"),
            BinaryOp::GreaterOrEqual => SQLChunk::raw_static(">="),
            BinaryOp::And => SQLChunk::raw_static("AND"),
            BinaryOp::Or => SQLChunk::raw_static("OR"),
            BinaryOp::In => SQLChunk::Token(Token::IN),
            BinaryOp::Comma => SQLChunk::Token(Token::COMMA),
        }
    }

    /// `NOT x`, `-x`, `COUNT(x)`, `UPPER(x)`. `operand` arrives already
    /// parenthesized when it is composite.
    fn unary(&self, op: UnaryOperator, operand: SQL) -> SQL {
        match op {
            UnaryOperator::Not => SQL::token(Token::NOT).append(operand),
            UnaryOperator::Negate => SQL::token(Token::MINUS).append(operand),
            UnaryOperator::Aggregate(function) => self.aggregate(function, operand, false),
            UnaryOperator::Function(function) => self.function(function, operand),
        }
    }

    fn aggregate(&self, function: AggregateFunction, operand: SQL, distinct: bool) -> SQL {
        let operand = if distinct {
            SQL::token(Token::DISTINCT).append(operand)
        } else {
            operand
        };
        SQL::func(function.sql_name(), operand)
    }

    fn function(&self, function: ScalarFunction, operand: SQL) -> SQL {
        SQL::func(function.sql_name(), operand)
    }

    /// Paging clause appended after ORDER BY.
    fn paging(&self, skip: Option<u64>, take: Option<u64>) -> Option<SQL> {
        match (skip, take) {
            (None, None) => None,
            (None, Some(take)) => Some(SQL::raw("LIMIT").push(SQLChunk::Number(take))),
            (Some(skip), None) => Some(SQL::raw("OFFSET").push(SQLChunk::Number(skip))),
            (Some(skip), Some(take)) => Some(
                SQL::raw("LIMIT")
                    .push(SQLChunk::Number(take))
                    .push(SQLChunk::raw_static("OFFSET"))
                    .push(SQLChunk::Number(skip)),
            ),
        }
    }

    /// Alias under which a table's row-id column is selected.
    fn row_id_alias(&self, table_alias: &str) -> CompactString {
        format_compact!("{table_alias}.{ROW_ID}")
    }
}

/// Plain ANSI rendering with SQLite placeholders; for tests and SQL previews.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiSyntax;

impl SqlSyntax for AnsiSyntax {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }
}
