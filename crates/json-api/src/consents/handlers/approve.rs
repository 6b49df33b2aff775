//! Approve Consent Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_app::{
    approvals::ApprovalToken,
    domain::consents::{outcomes::ApprovalOutcome, records::ConsentStatus},
};

use crate::{
    consents::{ConsentResponse, into_status_error, models::uuids_of},
    extensions::*,
    observability::record_transition,
    state::State,
};

/// Approval Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ApprovalResponse {
    /// The approved consent, or the rejected one if its validity had elapsed
    pub consent: ConsentResponse,

    /// Previously active versions revoked by this approval
    pub revoked: Vec<Uuid>,

    /// Other pending requests rejected by this approval
    pub rejected: Vec<Uuid>,
}

impl From<ApprovalOutcome> for ApprovalResponse {
    fn from(outcome: ApprovalOutcome) -> Self {
        match outcome {
            ApprovalOutcome::Approved {
                consent,
                revoked,
                rejected,
            } => ApprovalResponse {
                consent: consent.into(),
                revoked: uuids_of(revoked),
                rejected: uuids_of(rejected),
            },
            ApprovalOutcome::NoEffect(consent) => ApprovalResponse {
                consent: consent.into(),
                revoked: Vec::new(),
                rejected: Vec::new(),
            },
        }
    }
}

fn record_metrics(outcome: &ApprovalOutcome) {
    match outcome {
        ApprovalOutcome::Approved {
            revoked, rejected, ..
        } => {
            record_transition(ConsentStatus::Active, 1);
            record_transition(ConsentStatus::Revoked, revoked.len());
            record_transition(ConsentStatus::Rejected, rejected.len());
        }
        ApprovalOutcome::NoEffect(_) => record_transition(ConsentStatus::Rejected, 1),
    }
}

/// Approve Consent Handler
///
/// Redeems an approval token, activating its consent and superseding the rest of the group.
#[endpoint(
    tags("consents"),
    summary = "Approve Consent",
    responses(
        (status_code = StatusCode::OK, description = "Token redeemed"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown, used or expired token"),
        (status_code = StatusCode::CONFLICT, description = "Concurrent change, retry"),
    ),
)]
pub(crate) async fn handler(
    token: PathParam<String>,
    depot: &mut Depot,
) -> Result<Json<ApprovalResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let outcome = state
        .app
        .consents
        .approve_by_token(ApprovalToken::new(token.into_inner()))
        .await
        .map_err(into_status_error)?;

    record_metrics(&outcome);

    Ok(Json(outcome.into()))
}
