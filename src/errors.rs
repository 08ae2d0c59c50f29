//! # Error Handling for relation endpoints
//!
//! [`LinkError`] separates the three outcomes callers must be able to tell
//! apart (bad payload, unknown entity, failed mutation) and keeps storage
//! details out of anything sent to users.
//!
//! Internal causes are logged with `tracing` when the error is raised. No
//! output appears unless the host application installs a subscriber:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt().with_target(false).compact().init();
//! ```

use crate::linker::Operation;
use crate::validation::ValidationErrors;
use sea_orm::DbErr;
use std::fmt;

/// Public message for every storage failure during attach, detach or sync
pub const OPERATION_FAILED_MESSAGE: &str = "Something went wrong. Are you sure the items exist?";

const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";
pub(crate) const NOT_FOUND_MESSAGE: &str = "Resource not found";
pub(crate) const DATABASE_ERROR_MESSAGE: &str = "A database error occurred";

#[derive(Debug)]
pub enum LinkError {
    /// Payload field missing or not an array. Storage was not touched.
    Validation(ValidationErrors),

    /// No entity for the requested id
    NotFound,

    /// The relation mutation failed in storage.
    ///
    /// Callers only ever get [`OPERATION_FAILED_MESSAGE`]; the real cause is
    /// kept in `source` and logged. This makes failures opaque to API
    /// clients, who cannot tell a missing related id from any other storage
    /// problem.
    OperationFailed {
        operation: Operation,
        relation: String,
        source: DbErr,
    },

    /// Entity lookup failed in storage (details logged, not exposed)
    Database(DbErr),
}

impl LinkError {
    pub(crate) fn operation_failed(operation: Operation, relation: &str, source: DbErr) -> Self {
        tracing::error!(
            %operation,
            relation,
            error = ?source,
            "Relation operation failed"
        );
        Self::OperationFailed {
            operation,
            relation: relation.to_string(),
            source,
        }
    }

    pub(crate) fn database(source: DbErr) -> Self {
        tracing::error!(error = ?source, "Database error occurred");
        Self::Database(source)
    }

    /// The sanitized message shown to callers
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => VALIDATION_FAILED_MESSAGE,
            Self::NotFound => NOT_FOUND_MESSAGE,
            Self::OperationFailed { .. } => OPERATION_FAILED_MESSAGE,
            Self::Database(_) => DATABASE_ERROR_MESSAGE,
        }
    }

    /// Field-level details, only present for validation failures
    #[must_use]
    pub fn details(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::OperationFailed { source, .. } | Self::Database(source) => Some(source),
            Self::NotFound => None,
        }
    }
}

impl From<ValidationErrors> for LinkError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<DbErr> for LinkError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use std::error::Error;

    #[test]
    fn test_operation_failed_hides_cause() {
        let err = LinkError::operation_failed(
            Operation::Attach,
            "tags",
            DbErr::Custom("FOREIGN KEY constraint failed".to_string()),
        );
        assert_eq!(err.to_string(), OPERATION_FAILED_MESSAGE);
        assert!(!err.to_string().contains("FOREIGN KEY"));
        assert!(err.details().is_none());
    }

    #[test]
    fn test_operation_failed_keeps_source_internally() {
        let err = LinkError::operation_failed(
            Operation::Sync,
            "tags",
            DbErr::Custom("constraint".to_string()),
        );
        let source = err.source().expect("source should be kept");
        assert!(source.to_string().contains("constraint"));
    }

    #[test]
    fn test_validation_exposes_details() {
        let err = LinkError::from(ValidationErrors::from(ValidationError::new(
            "items",
            "The items field is required.",
        )));
        assert_eq!(err.user_message(), "Validation failed");
        assert_eq!(err.details().map(ValidationErrors::len), Some(1));
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err: LinkError = DbErr::Type("Type mismatch error".to_string()).into();
        assert!(matches!(err, LinkError::Database(_)));
        assert_eq!(err.to_string(), "A database error occurred");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(LinkError::NotFound.to_string(), "Resource not found");
        assert!(LinkError::NotFound.source().is_none());
    }
}
