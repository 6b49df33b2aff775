//! Evaluate Processing Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_app::{
    domain::consents::{
        data::ProcessingRequest, outcomes::ProcessingOutcome, records::ConsentStatus,
    },
    policy::{DenyReason, PolicyDecision},
};

use crate::{
    consents::into_status_error,
    extensions::*,
    observability::{record_processing_decision, record_transition},
    state::State,
};

/// Process Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProcessRequest {
    pub user_id: String,
    pub purpose: String,
    pub data_types: Vec<String>,

    /// Consent version resolved earlier; a newer version denies with `STALE_VERSION`
    #[serde(default)]
    pub version: Option<u32>,
}

impl From<ProcessRequest> for ProcessingRequest {
    fn from(request: ProcessRequest) -> Self {
        ProcessingRequest {
            user_id: request.user_id,
            purpose: request.purpose,
            data_types: request.data_types,
            version: request.version,
        }
    }
}

/// Processing Decision Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ProcessDecisionResponse {
    /// `ALLOW` or `DENY`
    pub decision: String,

    /// Deny reason token, e.g. `DATA_TYPE_NOT_CONSENTED`
    pub reason: Option<String>,

    /// The data type that was not consented to, if that was the reason
    pub data_type: Option<String>,

    /// The consent version the decision was made against
    pub consent_uuid: Option<Uuid>,

    pub consent_version: Option<u32>,

    /// Ledger entry recording the decision
    pub audit_uuid: Uuid,
}

impl From<&ProcessingOutcome> for ProcessDecisionResponse {
    fn from(outcome: &ProcessingOutcome) -> Self {
        let (decision, reason) = match &outcome.decision {
            PolicyDecision::Allow => ("ALLOW", None),
            PolicyDecision::Deny(reason) => ("DENY", Some(reason)),
        };

        ProcessDecisionResponse {
            decision: decision.to_string(),
            reason: reason.map(|reason| reason.code().to_string()),
            data_type: reason
                .and_then(DenyReason::data_type)
                .map(ToOwned::to_owned),
            consent_uuid: outcome.consent.as_ref().map(|consent| consent.uuid.into()),
            consent_version: outcome.consent.as_ref().map(|consent| consent.version),
            audit_uuid: outcome.audit_uuid.into(),
        }
    }
}

/// Process Handler
///
/// Decides whether data may be processed under the user's current consent.
#[endpoint(
    tags("processing"),
    summary = "Evaluate Processing Request",
    responses(
        (status_code = StatusCode::OK, description = "Processing allowed"),
        (status_code = StatusCode::FORBIDDEN, description = "Processing denied"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<ProcessRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<ProcessDecisionResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let outcome = state
        .app
        .consents
        .evaluate_processing(json.into_inner().into())
        .await
        .map_err(into_status_error)?;

    record_processing_decision(&outcome.decision);

    if outcome.decision == PolicyDecision::Deny(DenyReason::ConsentExpired) {
        record_transition(ConsentStatus::Expired, 1);
    }

    if !outcome.decision.is_allowed() {
        res.status_code(StatusCode::FORBIDDEN);
    }

    Ok(Json(ProcessDecisionResponse::from(&outcome)))
}
