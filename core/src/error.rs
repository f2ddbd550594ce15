use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowshapeError {
    /// The mapping contains a construct the compiler cannot translate
    #[error("Unsupported mapping `{expr}`: {reason}")]
    UnsupportedMapping { expr: String, reason: String },

    /// Breadcrumb wrapper: `expr` encloses the sub-expression that failed
    #[error("Error compiling `{expr}`")]
    Within {
        expr: String,
        #[source]
        source: Box<RowshapeError>,
    },

    /// Internal compiler state is inconsistent
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A non-collection slot received more than one distinct row
    #[error("Cardinality violation on `{table}` at `{path}`: {detail}")]
    CardinalityViolation {
        table: String,
        path: String,
        detail: String,
    },

    /// Right hand side of a membership test references row data
    #[error(
        "Membership operand `{expr}` must be built from constants or arguments, not from query columns"
    )]
    MembershipOperand { expr: String },

    /// A cell or graph could not be converted to the requested type
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Argument evaluation or parameter binding failed
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Error reported by the driver collaborator, passed through unchanged
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl RowshapeError {
    pub fn unsupported(expr: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnsupportedMapping {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn driver(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Driver(error.into())
    }

    /// Wraps `self` with the enclosing expression. Invariant violations are
    /// never wrapped so callers can match on them directly.
    pub fn within(self, expr: impl ToString) -> Self {
        match self {
            Self::InvariantViolation(_) => self,
            other => Self::Within {
                expr: expr.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Enclosing expressions, outermost first.
    pub fn breadcrumbs(&self) -> Vec<&str> {
        let mut crumbs = Vec::new();
        let mut current = self;
        while let Self::Within { expr, source } = current {
            crumbs.push(expr.as_str());
            current = source;
        }
        crumbs
    }

    /// The innermost error beneath any breadcrumb wrappers.
    pub fn root_cause(&self) -> &RowshapeError {
        let mut current = self;
        while let Self::Within { source, .. } = current {
            current = source;
        }
        current
    }
}

impl From<serde_json::Error> for RowshapeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Conversion(error.to_string())
    }
}

/// Result type for compilation and execution
pub type Result<T> = std::result::Result<T, RowshapeError>;

/// Attaches a breadcrumb to the error side of a result.
pub(crate) trait ResultExt<T> {
    fn within(self, expr: impl ToString) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    #[inline]
    fn within(self, expr: impl ToString) -> Result<T> {
        self.map_err(|e| e.within(expr))
    }
}
