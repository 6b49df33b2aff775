//! Audit Errors

use salvo::http::StatusError;
use tracing::error;

use consent_app::domain::audit::AuditError;

pub(crate) fn into_status_error(error: AuditError) -> StatusError {
    error!("failed to read audit ledger: {error}");

    StatusError::internal_server_error()
}
