//! Audit Data

use serde_json::Value;

use crate::domain::{
    audit::records::AuditEventType,
    consents::records::{ConsentRecord, ConsentUuid},
};

/// An entry waiting to be linked into the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub event_type: AuditEventType,
    pub consent_uuid: Option<ConsentUuid>,
    pub user_id: String,
    pub details: Value,
}

impl NewAuditEntry {
    #[must_use]
    pub fn for_consent(event_type: AuditEventType, consent: &ConsentRecord, details: Value) -> Self {
        Self {
            event_type,
            consent_uuid: Some(consent.uuid),
            user_id: consent.user_id.clone(),
            details,
        }
    }

    #[must_use]
    pub fn without_consent(event_type: AuditEventType, user_id: &str, details: Value) -> Self {
        Self {
            event_type,
            consent_uuid: None,
            user_id: user_id.to_string(),
            details,
        }
    }
}
