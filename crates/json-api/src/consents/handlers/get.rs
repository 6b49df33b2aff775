//! Get Consent Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    consents::{ConsentResponse, into_status_error},
    extensions::*,
    state::State,
};

/// Get Consent Handler
///
/// Returns any consent version, whatever its status.
#[endpoint(
    tags("consents"),
    summary = "Get Consent",
    responses(
        (status_code = StatusCode::OK, description = "Consent found"),
        (status_code = StatusCode::NOT_FOUND, description = "Consent not found"),
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
        .get(consent.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(consent.into()))
}
