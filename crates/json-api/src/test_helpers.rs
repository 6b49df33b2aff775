//! Test helpers.

use std::{collections::BTreeSet, sync::Arc};

use jiff::{SignedDuration, Timestamp};
use salvo::{affix_state::inject, prelude::*};
use serde_json::json;

use consent_app::{
    approvals::ApprovalToken,
    context::AppContext,
    domain::{
        audit::{
            MockAuditService,
            records::{AuditEventType, AuditRecord, AuditUuid},
        },
        consents::{
            MockConsentsService,
            records::{ConsentGroupId, ConsentRecord, ConsentStatus, ConsentUuid},
        },
    },
};

use crate::{admin, state::State};

pub(crate) const TEST_ADMIN_KEY: &str = "test-admin-key";

fn state(
    consents: MockConsentsService,
    audit: MockAuditService,
    admin_api_key: Option<&str>,
) -> Arc<State> {
    State::from_app_context(
        AppContext {
            consents: Arc::new(consents),
            audit: Arc::new(audit),
        },
        admin_api_key.map(ToOwned::to_owned),
    )
}

pub(crate) fn state_with_consents(consents: MockConsentsService) -> Arc<State> {
    state(consents, MockAuditService::new(), Some(TEST_ADMIN_KEY))
}

pub(crate) fn state_with_audit(
    audit: MockAuditService,
    admin_api_key: Option<&str>,
) -> Arc<State> {
    state(MockConsentsService::new(), audit, admin_api_key)
}

pub(crate) fn consents_service(consents: MockConsentsService, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state_with_consents(consents)))
            .push(route),
    )
}

pub(crate) fn audit_service(audit: MockAuditService, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state_with_audit(audit, Some(TEST_ADMIN_KEY))))
            .hoop(admin::middleware::handler)
            .push(route),
    )
}

pub(crate) fn make_consent(status: ConsentStatus) -> ConsentRecord {
    let requested = status == ConsentStatus::Requested;

    ConsentRecord {
        uuid: ConsentUuid::new(),
        group_id: ConsentGroupId::new("user-1", "marketing"),
        version: 1,
        user_id: "user-1".to_string(),
        purpose: "marketing".to_string(),
        data_types: BTreeSet::from(["email".to_string(), "phone".to_string()]),
        valid_until: Timestamp::UNIX_EPOCH + SignedDuration::from_hours(24 * 365 * 100),
        status,
        approval_token: requested.then(|| ApprovalToken::new("a".repeat(64))),
        approval_expires_at: requested.then_some(Timestamp::UNIX_EPOCH),
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn make_audit_record(event_type: AuditEventType, sequence: i64) -> AuditRecord {
    AuditRecord {
        uuid: AuditUuid::new(),
        sequence,
        event_type,
        consent_uuid: Some(ConsentUuid::new()),
        user_id: "user-1".to_string(),
        timestamp: Timestamp::UNIX_EPOCH,
        details: json!({ "purpose": "marketing", "version": 1 }),
        prev_hash: (sequence > 1).then(|| "0".repeat(64)),
        hash: "f".repeat(64),
    }
}
