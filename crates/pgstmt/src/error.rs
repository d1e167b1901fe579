//! Error types for pgstmt

use std::fmt;
use thiserror::Error;

/// Result type alias for pgstmt operations
pub type StmtResult<T> = Result<T, StmtError>;

/// SQLSTATE class for integrity constraint violations.
const INTEGRITY_CONSTRAINT_CLASS: &str = "23";

/// Error types for statement building and execution.
///
/// The first seven variants are raised while a statement is being built, before
/// any session is opened. The rest come back from execution.
#[derive(Debug, Error)]
pub enum StmtError {
    /// Table or column name that cannot be rendered as an identifier
    #[error("Invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Operator that needs a value got none
    #[error("Filter on column '{column}' with operator {operator} requires a value")]
    MissingFilterValue {
        column: String,
        operator: &'static str,
    },

    /// Value of the wrong shape for the operator
    #[error("Invalid filter value for column '{column}': {message}")]
    InvalidFilterValue { column: String, message: String },

    /// Operator name outside the supported vocabulary
    #[error("Unknown filter operator: {0:?}")]
    UnknownOperator(String),

    /// Field sets that do not line up (batch rows, duplicate or unbound columns)
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Statement that needs a WHERE clause has none
    #[error("Missing filter: {0}")]
    MissingFilter(String),

    /// Filter cannot be appended to the base statement
    #[error("Filter not applicable: {0}")]
    FilterNotApplicable(String),

    /// Row value could not be projected into the requested type
    #[error("Projection error on column '{column}': {message}")]
    Projection { column: String, message: String },

    /// Integrity constraint violation reported by the server
    #[error("Constraint violation: {0}")]
    ConstraintViolation(Diagnostic),

    /// Any other driver failure
    #[error("Driver error: {0}")]
    Driver(#[from] tokio_postgres::Error),

    /// Session could not be acquired
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Server diagnostic attached to a [`StmtError::ConstraintViolation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// SQLSTATE code, e.g. `23505`.
    pub code: String,
    /// Name of the violated constraint, when the server reports one.
    pub constraint: Option<String>,
    /// Table the constraint belongs to, when the server reports one.
    pub table: Option<String>,
    /// Primary error message.
    pub message: String,
    /// Optional detail line (e.g. `Key (id)=(EEE) already exists.`).
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            constraint: None,
            table: None,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// `23505`
    pub fn is_unique_violation(&self) -> bool {
        self.code == "23505"
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code)?;
        if let Some(constraint) = &self.constraint {
            write!(f, "{constraint}: ")?;
        }
        f.write_str(&self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl StmtError {
    pub fn invalid_identifier(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_filter_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilterValue {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn projection(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Projection {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    /// Check if this is a constraint violation error
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(d) if d.is_unique_violation())
    }

    /// Whether the error was detected before anything was sent to the server.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier { .. }
                | Self::MissingFilterValue { .. }
                | Self::InvalidFilterValue { .. }
                | Self::UnknownOperator(_)
                | Self::SchemaMismatch(_)
                | Self::MissingFilter(_)
                | Self::FilterNotApplicable(_)
        )
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation(d) => Some(&d.code),
            Self::Driver(err) => err.code().map(|c| c.code()),
            _ => None,
        }
    }

    /// Classify a `tokio_postgres` error.
    ///
    /// Integrity constraint violations (SQLSTATE class `23`) become
    /// [`StmtError::ConstraintViolation`] with the server diagnostic preserved;
    /// everything else is passed through as [`StmtError::Driver`].
    pub fn from_driver(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code();
            if code.starts_with(INTEGRITY_CONSTRAINT_CLASS) {
                return Self::ConstraintViolation(Diagnostic {
                    code: code.to_string(),
                    constraint: db_err.constraint().map(str::to_string),
                    table: db_err.table().map(str::to_string),
                    message: db_err.message().to_string(),
                    detail: db_err.detail().map(str::to_string),
                });
            }
        }
        Self::Driver(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_includes_code_and_constraint() {
        let d = Diagnostic::new("23505", "duplicate key value violates unique constraint")
            .with_constraint("currencies_pkey")
            .with_detail("Key (id)=(EEE) already exists.");
        assert_eq!(
            d.to_string(),
            "[23505] currencies_pkey: duplicate key value violates unique constraint \
             (Key (id)=(EEE) already exists.)"
        );
        assert!(d.is_unique_violation());
    }

    #[test]
    fn constraint_violation_exposes_sqlstate() {
        let err = StmtError::ConstraintViolation(Diagnostic::new("23503", "fk"));
        assert_eq!(err.sqlstate(), Some("23503"));
        assert!(err.is_constraint_violation());
        assert!(!err.is_unique_violation());
        assert!(!err.is_build_error());
    }

    #[test]
    fn build_errors_are_flagged() {
        assert!(StmtError::MissingFilter("x".into()).is_build_error());
        assert!(StmtError::UnknownOperator("LIKE".into()).is_build_error());
        assert!(!StmtError::Connection("refused".into()).is_build_error());
        assert!(!StmtError::projection("id", "missing").is_build_error());
    }
}
