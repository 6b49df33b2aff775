//! Reject Consent Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_app::{
    approvals::ApprovalToken,
    domain::consents::{outcomes::RejectionOutcome, records::ConsentStatus},
};

use crate::{
    consents::{ConsentResponse, into_status_error, models::uuids_of},
    extensions::*,
    observability::record_transition,
    state::State,
};

/// Rejection Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RejectionResponse {
    pub consent: ConsentResponse,

    /// Other pending requests in the group, rejected alongside
    pub superseded: Vec<Uuid>,
}

impl From<RejectionOutcome> for RejectionResponse {
    fn from(outcome: RejectionOutcome) -> Self {
        RejectionResponse {
            consent: outcome.consent.into(),
            superseded: uuids_of(outcome.superseded),
        }
    }
}

/// Reject Consent Handler
///
/// Redeems an approval token to decline the request.
#[endpoint(
    tags("consents"),
    summary = "Reject Consent",
    responses(
        (status_code = StatusCode::OK, description = "Token redeemed"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown, used or expired token"),
    ),
)]
pub(crate) async fn handler(
    token: PathParam<String>,
    depot: &mut Depot,
) -> Result<Json<RejectionResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let outcome = state
        .app
        .consents
        .reject_by_token(ApprovalToken::new(token.into_inner()))
        .await
        .map_err(into_status_error)?;

    record_transition(ConsentStatus::Rejected, 1 + outcome.superseded.len());

    Ok(Json(outcome.into()))
}
