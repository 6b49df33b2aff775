//! Consents service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::audit::AuditError;

#[derive(Debug, Error)]
pub enum ConsentsServiceError {
    /// Arguments were rejected before anything was written.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("consent not found")]
    NotFound,

    /// The consent exists but is not `ACTIVE`.
    #[error("consent is not active")]
    NotActive,

    /// No unexpired `REQUESTED` consent carries the token.
    #[error("approval token not found")]
    TokenNotFound,

    /// A concurrent writer won a uniqueness race; retrying is safe.
    #[error("conflicting concurrent change")]
    Conflict,

    #[error("storage error")]
    Sql(#[source] Error),

    #[error("audit ledger error")]
    Audit(#[source] AuditError),
}

impl From<Error> for ConsentsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => {
                Self::InvalidInput("rejected by storage constraints".to_string())
            }
            Some(ErrorKind::ForeignKeyViolation | ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<AuditError> for ConsentsServiceError {
    fn from(error: AuditError) -> Self {
        match error {
            AuditError::Sql(source) => Self::from(source),
            other => Self::Audit(other),
        }
    }
}
