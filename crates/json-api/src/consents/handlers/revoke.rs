//! Revoke Consent Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use consent_app::domain::consents::records::ConsentStatus;

use crate::{
    consents::{ConsentResponse, into_status_error},
    extensions::*,
    observability::record_transition,
    state::State,
};

/// Revoke Consent Handler
///
/// Revokes one specific `ACTIVE` version.
#[endpoint(
    tags("consents"),
    summary = "Revoke Consent",
    responses(
        (status_code = StatusCode::OK, description = "Consent revoked"),
        (status_code = StatusCode::NOT_FOUND, description = "Consent not found"),
        (status_code = StatusCode::CONFLICT, description = "Consent is not active"),
    ),
)]
pub(crate) async fn handler(
    consent: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<ConsentResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let consent = state
        .app
        .consents
        .revoke(consent.into_inner().into())
        .await
        .map_err(into_status_error)?;

    record_transition(ConsentStatus::Revoked, 1);

    Ok(Json(consent.into()))
}
