//! Consent Errors

use salvo::http::StatusError;
use tracing::error;

use consent_app::domain::consents::ConsentsServiceError;

pub(crate) fn into_status_error(error: ConsentsServiceError) -> StatusError {
    match error {
        ConsentsServiceError::InvalidInput(reason) => StatusError::bad_request().brief(reason),
        ConsentsServiceError::NotFound => StatusError::not_found().brief("Consent not found"),
        ConsentsServiceError::TokenNotFound => {
            StatusError::not_found().brief("Approval token not found or expired")
        }
        ConsentsServiceError::NotActive => {
            StatusError::conflict().brief("Consent is not active")
        }
        ConsentsServiceError::Conflict => {
            StatusError::conflict().brief("Conflicting concurrent change, retry the request")
        }
        ConsentsServiceError::Sql(source) => {
            error!("consent storage failure: {source}");

            StatusError::internal_server_error()
        }
        ConsentsServiceError::Audit(source) => {
            error!("audit ledger failure: {source}");

            StatusError::internal_server_error()
        }
    }
}
