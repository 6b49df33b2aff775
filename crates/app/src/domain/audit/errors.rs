//! Audit ledger errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("storage error")]
    Sql(#[from] sqlx::Error),

    /// The ledger tail pointer row is missing.
    #[error("audit chain head is missing")]
    MissingChainHead,

    /// Entry details could not be put in canonical form for hashing.
    #[error("audit details could not be canonicalized")]
    Canonicalize(#[from] serde_json::Error),

    #[error("audit timestamp out of range")]
    Timestamp(#[source] jiff::Error),
}
