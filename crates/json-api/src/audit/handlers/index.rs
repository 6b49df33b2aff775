//! List Audit Entries Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::QueryParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use consent_app::domain::audit::records::AuditRecord;

use crate::{audit::into_status_error, extensions::*, state::State};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AuditEntryResponse {
    pub uuid: Uuid,

    /// Position in the chain
    pub sequence: i64,

    pub event_type: String,

    /// Absent for decisions made without any consent
    pub consent_uuid: Option<Uuid>,

    pub user_id: String,

    pub timestamp: String,

    pub details: Value,

    /// Hash of the preceding entry; absent for the first
    pub prev_hash: Option<String>,

    pub hash: String,
}

impl From<AuditRecord> for AuditEntryResponse {
    fn from(entry: AuditRecord) -> Self {
        AuditEntryResponse {
            uuid: entry.uuid.into(),
            sequence: entry.sequence,
            event_type: entry.event_type.as_str().to_string(),
            consent_uuid: entry.consent_uuid.map(Into::into),
            user_id: entry.user_id,
            timestamp: entry.timestamp.to_string(),
            details: entry.details,
            prev_hash: entry.prev_hash,
            hash: entry.hash,
        }
    }
}

/// List Audit Entries Handler
///
/// Returns the ledger in chain order, optionally narrowed to one consent version.
#[endpoint(
    tags("audit"),
    summary = "List Audit Entries",
    security(("api_key" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Ledger entries"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Missing or invalid API key"),
    ),
)]
pub(crate) async fn handler(
    consent_uuid: QueryParam<Uuid, false>,
    depot: &mut Depot,
) -> Result<Json<Vec<AuditEntryResponse>>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let entries = match consent_uuid.into_inner() {
        Some(consent) => state.app.audit.list_consent_entries(consent.into()).await,
        None => state.app.audit.list_entries().await,
    }
    .map_err(into_status_error)?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
