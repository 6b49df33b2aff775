//! Test Helpers

use jiff::{SignedDuration, Timestamp};

use crate::{
    approvals::ApprovalToken,
    domain::{
        audit::{AuditService, records::AuditEventType},
        consents::{
            ConsentsService, ConsentsServiceError,
            data::{NewConsent, ProcessingRequest},
            records::ConsentRecord,
        },
    },
    test::TestContext,
};

pub(crate) fn new_consent(user_id: &str, purpose: &str, data_types: &[&str]) -> NewConsent {
    NewConsent {
        user_id: user_id.to_string(),
        purpose: purpose.to_string(),
        data_types: data_types.iter().map(ToString::to_string).collect(),
        valid_until: Timestamp::now() + SignedDuration::from_hours(24 * 30),
    }
}

pub(crate) fn processing_request(
    user_id: &str,
    purpose: &str,
    data_types: &[&str],
) -> ProcessingRequest {
    ProcessingRequest {
        user_id: user_id.to_string(),
        purpose: purpose.to_string(),
        data_types: data_types.iter().map(ToString::to_string).collect(),
        version: None,
    }
}

pub(crate) async fn create_consent(
    ctx: &TestContext,
    user_id: &str,
    purpose: &str,
    data_types: &[&str],
) -> Result<ConsentRecord, ConsentsServiceError> {
    ctx.consents
        .create(new_consent(user_id, purpose, data_types))
        .await
}

/// The token a freshly created `REQUESTED` consent carries.
pub(crate) fn token_of(consent: &ConsentRecord) -> ApprovalToken {
    consent
        .approval_token
        .clone()
        .expect("requested consent should carry an approval token")
}

/// Create a consent and approve it with its token.
pub(crate) async fn create_active_consent(
    ctx: &TestContext,
    user_id: &str,
    purpose: &str,
    data_types: &[&str],
) -> Result<ConsentRecord, ConsentsServiceError> {
    let requested = create_consent(ctx, user_id, purpose, data_types).await?;

    ctx.consents.approve_by_token(token_of(&requested)).await?;

    ctx.consents.get(requested.uuid).await
}

pub(crate) async fn ledger_event_types(ctx: &TestContext) -> Vec<AuditEventType> {
    ctx.audit
        .list_entries()
        .await
        .expect("ledger should be readable")
        .into_iter()
        .map(|entry| entry.event_type)
        .collect()
}
