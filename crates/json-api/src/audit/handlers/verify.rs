//! Verify Audit Chain Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_app::domain::audit::chain::{ChainBreak, ChainVerification};

use crate::{audit::into_status_error, extensions::*, state::State};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ChainBreakResponse {
    /// Zero-based position of the first divergent entry
    pub index: usize,

    pub audit_uuid: Uuid,

    /// `HASH_MISMATCH` or `LINK_MISMATCH`
    pub kind: String,
}

impl From<ChainBreak> for ChainBreakResponse {
    fn from(chain_break: ChainBreak) -> Self {
        ChainBreakResponse {
            index: chain_break.index,
            audit_uuid: chain_break.audit_uuid.into(),
            kind: chain_break.kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ChainVerificationResponse {
    pub intact: bool,

    /// Entries examined
    pub entries: usize,

    pub first_break: Option<ChainBreakResponse>,
}

impl From<ChainVerification> for ChainVerificationResponse {
    fn from(verification: ChainVerification) -> Self {
        ChainVerificationResponse {
            intact: verification.is_intact(),
            entries: verification.entries,
            first_break: verification.first_break.map(Into::into),
        }
    }
}

/// Verify Audit Chain Handler
///
/// Recomputes every hash and link in the ledger.
#[endpoint(
    tags("audit"),
    summary = "Verify Audit Chain",
    security(("api_key" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Verification result"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Missing or invalid API key"),
    ),
)]
pub(crate) async fn handler(
    depot: &mut Depot,
) -> Result<Json<ChainVerificationResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let verification = state.app.audit.verify().await.map_err(into_status_error)?;

    Ok(Json(verification.into()))
}
