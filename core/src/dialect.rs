//! SQL dialect identification and placeholder rendering.

use std::borrow::Cow;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    SQLite,
    PostgreSQL,
}

impl Dialect {
    /// Renders a placeholder for this dialect with the given 1-based index.
    ///
    /// Returns `Cow::Borrowed("?")` for SQLite (zero allocation),
    /// `Cow::Owned` for PostgreSQL numbered placeholders.
    ///
    /// # Examples
    /// - PostgreSQL: `$1`, `$2`, `$3`
    /// - SQLite: `?`
    #[inline]
    pub fn render_placeholder(self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::PostgreSQL => Cow::Owned(format!("${index}")),
            Dialect::SQLite => Cow::Borrowed("?"),
        }
    }

    /// Writes a placeholder without allocating.
    #[inline]
    pub fn write_placeholder(self, index: usize, buf: &mut String) {
        match self {
            Dialect::PostgreSQL => {
                let _ = write!(buf, "${index}");
            }
            Dialect::SQLite => buf.push('?'),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Dialect::SQLite => "sqlite",
            Dialect::PostgreSQL => "postgresql",
        }
    }
}
