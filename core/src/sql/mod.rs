mod chunk;
mod token;

use std::borrow::Cow;
use std::fmt::Write;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::dialect::Dialect;
use crate::error::{Result, RowshapeError};
use crate::params::ParamId;
use crate::value::Value;

pub use chunk::SQLChunk;
pub(crate) use chunk::chunk_needs_space;
pub use token::Token;

/// Predicate rendered for a membership test against an empty list.
pub const FALSE_PREDICATE: &str = "1 = 0";

/// SQL fragment builder with flat chunk storage.
///
/// Uses `SmallVec<[SQLChunk; 8]>` for inline storage of typical SQL fragments
/// without heap allocation. Parameters are stored as pool slots and only
/// turned into placeholders by [`SQL::render`], because list parameters
/// expand to a different number of placeholders on every execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SQL {
    pub chunks: SmallVec<[SQLChunk; 8]>,
}

/// SQL text plus positional parameters, ready for a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub text: String,
    pub params: Vec<Value>,
}

impl SQL {
    // ==================== constructors ====================

    /// Creates an empty SQL fragment
    #[inline]
    pub const fn empty() -> Self {
        Self {
            chunks: SmallVec::new_const(),
        }
    }

    /// Creates SQL with a single token
    #[inline]
    pub fn token(t: Token) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Token(t)],
        }
    }

    /// Creates SQL with a quoted identifier
    #[inline]
    pub fn ident(name: impl Into<CompactString>) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Ident(name.into())],
        }
    }

    /// `"table"."column"`
    #[inline]
    pub fn qualified(table: impl Into<CompactString>, column: impl Into<CompactString>) -> Self {
        Self {
            chunks: smallvec::smallvec![
                SQLChunk::Ident(table.into()),
                SQLChunk::Token(Token::DOT),
                SQLChunk::Ident(column.into()),
            ],
        }
    }

    /// Creates SQL with raw text (unquoted)
    #[inline]
    pub fn raw(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Raw(text.into())],
        }
    }

    /// Creates SQL with a single unsigned integer literal.
    #[inline]
    pub fn number(value: u64) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Number(value)],
        }
    }

    /// Creates SQL with a single parameter slot
    #[inline]
    pub fn param(id: ParamId) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::Param(id)],
        }
    }

    /// `subject IN (...)` over an expanded list parameter
    #[inline]
    pub fn in_list(subject: SQL, param: ParamId) -> Self {
        Self {
            chunks: smallvec::smallvec![SQLChunk::InList {
                subject: Box::new(subject),
                param,
            }],
        }
    }

    /// Creates SQL for a function call: NAME(args)
    #[inline]
    pub fn func(name: impl Into<Cow<'static, str>>, args: SQL) -> Self {
        let args = if args.is_subquery() { args.parens() } else { args };
        SQL {
            chunks: smallvec::smallvec![SQLChunk::Function(name.into())],
        }
        .push(Token::LPAREN)
        .append(args)
        .push(Token::RPAREN)
    }

    // ==================== builder methods ====================

    /// Append another SQL fragment (flat extend)
    #[inline]
    pub fn append(mut self, other: impl Into<SQL>) -> Self {
        self.append_mut(other);
        self
    }

    #[inline]
    pub fn append_mut(&mut self, other: impl Into<SQL>) {
        let other = other.into();
        if self.chunks.is_empty() {
            self.chunks = other.chunks;
            return;
        }
        self.chunks.extend(other.chunks);
    }

    /// Push a single chunk
    #[inline]
    pub fn push(mut self, chunk: impl Into<SQLChunk>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    #[inline]
    pub fn push_mut(&mut self, chunk: impl Into<SQLChunk>) {
        self.chunks.push(chunk.into());
    }

    // ==================== combinators ====================

    /// Joins multiple SQL fragments with a separator
    pub fn join(sqls: impl IntoIterator<Item = SQL>, separator: Token) -> SQL {
        let mut iter = sqls.into_iter();
        let Some(mut result) = iter.next() else {
            return SQL::empty();
        };
        for item in iter {
            result.chunks.push(SQLChunk::Token(separator));
            result.chunks.extend(item.chunks);
        }
        result
    }

    /// Wrap in parentheses: (self)
    #[inline]
    pub fn parens(self) -> Self {
        SQL::token(Token::LPAREN).append(self).push(Token::RPAREN)
    }

    /// Check if this SQL fragment is a subquery (starts with SELECT)
    #[inline]
    pub fn is_subquery(&self) -> bool {
        matches!(self.chunks.first(), Some(SQLChunk::Token(Token::SELECT)))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Creates an aliased version: self AS "name"
    pub fn alias(self, name: impl Into<CompactString>) -> SQL {
        self.push(Token::AS).push(SQLChunk::Ident(name.into()))
    }

    /// True when rendering can produce different text per execution.
    pub fn has_list_parameters(&self) -> bool {
        self.chunks
            .iter()
            .any(|c| matches!(c, SQLChunk::InList { .. }))
    }

    // ==================== output methods ====================

    /// Renders text with dialect placeholders; `bound` is indexed by [`ParamId`].
    pub fn render(&self, dialect: Dialect, bound: &[Value]) -> Result<RenderedSql> {
        let mut writer = Writer {
            dialect,
            bound,
            text: String::with_capacity(self.chunks.len().saturating_mul(8).max(128)),
            params: Vec::with_capacity(bound.len()),
        };
        writer.write_sql(self)?;
        Ok(RenderedSql {
            text: writer.text,
            params: writer.params,
        })
    }
}

struct Writer<'v> {
    dialect: Dialect,
    bound: &'v [Value],
    text: String,
    params: Vec<Value>,
}

impl Writer<'_> {
    fn write_sql(&mut self, sql: &SQL) -> Result<()> {
        for (i, chunk) in sql.chunks.iter().enumerate() {
            self.write_chunk(chunk)?;
            if let Some(next) = sql.chunks.get(i + 1)
                && chunk_needs_space(chunk, next)
            {
                self.text.push(' ');
            }
        }
        Ok(())
    }

    fn value(&self, id: ParamId) -> Result<&Value> {
        self.bound
            .get(id.index())
            .ok_or_else(|| RowshapeError::Parameter(format!("parameter {id} was not bound")))
    }

    fn placeholder(&mut self, value: Value) {
        self.params.push(value);
        self.dialect
            .write_placeholder(self.params.len(), &mut self.text);
    }

    fn write_chunk(&mut self, chunk: &SQLChunk) -> Result<()> {
        match chunk {
            SQLChunk::Token(token) => self.text.push_str(token.as_str()),
            SQLChunk::Ident(name) => {
                self.text.push('"');
                for c in name.chars() {
                    if c == '"' {
                        self.text.push('"');
                    }
                    self.text.push(c);
                }
                self.text.push('"');
            }
            SQLChunk::Raw(text) | SQLChunk::Function(text) => self.text.push_str(text),
            SQLChunk::Number(n) => {
                let _ = write!(self.text, "{n}");
            }
            SQLChunk::Param(id) => {
                let value = self.value(*id)?.clone();
                if let Value::List(_) = value {
                    return Err(RowshapeError::Parameter(format!(
                        "list parameter {id} used outside a membership test"
                    )));
                }
                self.placeholder(value);
            }
            SQLChunk::InList { subject, param } => {
                let Value::List(items) = self.value(*param)?.clone() else {
                    return Err(RowshapeError::Parameter(format!(
                        "membership parameter {param} is not a list"
                    )));
                };
                if items.is_empty() {
                    self.text.push_str(FALSE_PREDICATE);
                    return Ok(());
                }
                self.write_sql(subject)?;
                self.text.push_str(" IN (");
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.text.push_str(", ");
                    }
                    self.placeholder(item);
                }
                self.text.push(')');
            }
        }
        Ok(())
    }
}

// ==================== trait implementations ====================

impl From<Token> for SQL {
    fn from(value: Token) -> Self {
        SQL::token(value)
    }
}

impl From<SQLChunk> for SQL {
    fn from(value: SQLChunk) -> Self {
        SQL {
            chunks: smallvec::smallvec![value],
        }
    }
}

impl FromIterator<SQLChunk> for SQL {
    fn from_iter<I: IntoIterator<Item = SQLChunk>>(iter: I) -> Self {
        Self {
            chunks: SmallVec::from_iter(iter),
        }
    }
}

impl IntoIterator for SQL {
    type Item = SQLChunk;
    type IntoIter = smallvec::IntoIter<[SQLChunk; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}
