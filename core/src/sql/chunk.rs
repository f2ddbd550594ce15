use std::borrow::Cow;

use compact_str::CompactString;

use crate::params::ParamId;

use super::{SQL, Token};

/// A SQL chunk represents a part of an SQL statement.
///
/// - `Token` - SQL keywords and punctuation (SELECT, FROM, `(`, etc.)
/// - `Ident` - Quoted identifiers ("table_name", "column_name")
/// - `Raw` - Unquoted raw SQL text (operators, function names)
/// - `Function` - Function name, rendered directly against its argument list
/// - `Number` - Unsigned integer literal
/// - `Param` - Placeholder bound from the parameter pool
/// - `InList` - Membership test against an expanded list parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SQLChunk {
    /// Renders as: keyword with automatic spacing rules
    Token(Token),

    /// Renders as: "name" (with quotes, embedded quotes doubled)
    Ident(CompactString),

    /// Renders as: text (no quotes, as-is)
    Raw(Cow<'static, str>),

    /// Renders as: NAME, with no space before the following `(`
    Function(Cow<'static, str>),

    /// Renders as: the decimal value
    Number(u64),

    /// Renders as: ? or $1 depending on the dialect
    Param(ParamId),

    /// Renders as: `subject IN (?, ?, ...)` with one placeholder per list
    /// element, or a constant-false predicate when the list is empty
    InList { subject: Box<SQL>, param: ParamId },
}

impl SQLChunk {
    #[inline]
    pub const fn token(t: Token) -> Self {
        Self::Token(t)
    }

    #[inline]
    pub const fn raw_static(text: &'static str) -> Self {
        Self::Raw(Cow::Borrowed(text))
    }

    #[inline]
    pub fn ident(name: impl Into<CompactString>) -> Self {
        Self::Ident(name.into())
    }

    #[inline]
    pub fn raw(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Raw(text.into())
    }

    /// Check if this chunk is "word-like" (needs space separation from other word-like chunks)
    #[inline]
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !t.is_punctuation(),
            SQLChunk::Ident(_)
            | SQLChunk::Raw(_)
            | SQLChunk::Function(_)
            | SQLChunk::Number(_)
            | SQLChunk::Param(_)
            | SQLChunk::InList { .. } => true,
        }
    }
}

impl From<Token> for SQLChunk {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl From<ParamId> for SQLChunk {
    #[inline]
    fn from(value: ParamId) -> Self {
        Self::Param(value)
    }
}

/// Canonical spacing logic for SQL chunk rendering.
pub(crate) fn chunk_needs_space(current: &SQLChunk, next: &SQLChunk) -> bool {
    // No space if current raw text ends with space
    if let SQLChunk::Raw(text) = current
        && text.ends_with(' ')
    {
        return false;
    }

    // No space if next raw text starts with space
    if let SQLChunk::Raw(text) = next
        && text.starts_with(' ')
    {
        return false;
    }

    match (current, next) {
        // No space before closing/separator punctuation
        (_, SQLChunk::Token(Token::RPAREN | Token::COMMA | Token::DOT)) => false,
        // No space after opening punctuation or a unary minus
        (SQLChunk::Token(Token::LPAREN | Token::DOT | Token::MINUS), _) => false,
        // Space after comma
        (SQLChunk::Token(Token::COMMA), _) => true,
        // Unary minus is separated from whatever precedes it
        (_, SQLChunk::Token(Token::MINUS)) => true,
        // Space after closing paren if next is word-like (e.g., ") FROM")
        (SQLChunk::Token(Token::RPAREN), next) => next.is_word_like(),
        // Function calls hug their argument list: COUNT(
        (SQLChunk::Function(_), SQLChunk::Token(Token::LPAREN)) => false,
        // Space before opening paren if preceded by word-like (e.g., "AS (")
        (current, SQLChunk::Token(Token::LPAREN)) => current.is_word_like(),
        // Space between all word-like chunks
        _ => current.is_word_like() && next.is_word_like(),
    }
}
