//! Audit Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde_json::Value;
use thiserror::Error;

use crate::{domain::consents::records::ConsentUuid, uuids::TypedUuid};

/// Audit UUID
pub type AuditUuid = TypedUuid<AuditRecord>;

/// Kind of event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventType {
    ConsentRequested,
    ConsentApproved,
    ConsentRejected,
    ConsentCreated,
    ConsentRevoked,
    ConsentExpired,
    ProcessingAllowed,
    ProcessingDenied,
}

impl AuditEventType {
    pub const ALL: [Self; 8] = [
        Self::ConsentRequested,
        Self::ConsentApproved,
        Self::ConsentRejected,
        Self::ConsentCreated,
        Self::ConsentRevoked,
        Self::ConsentExpired,
        Self::ProcessingAllowed,
        Self::ProcessingDenied,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConsentRequested => "CONSENT_REQUESTED",
            Self::ConsentApproved => "CONSENT_APPROVED",
            Self::ConsentRejected => "CONSENT_REJECTED",
            Self::ConsentCreated => "CONSENT_CREATED",
            Self::ConsentRevoked => "CONSENT_REVOKED",
            Self::ConsentExpired => "CONSENT_EXPIRED",
            Self::ProcessingAllowed => "PROCESSING_ALLOWED",
            Self::ProcessingDenied => "PROCESSING_DENIED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown audit event type `{0}`")]
pub struct UnknownAuditEventType(pub String);

impl FromStr for AuditEventType {
    type Err = UnknownAuditEventType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == value)
            .ok_or_else(|| UnknownAuditEventType(value.to_string()))
    }
}

/// Audit Record
///
/// Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub uuid: AuditUuid,

    /// Insertion order, assigned by storage.
    pub sequence: i64,

    pub event_type: AuditEventType,

    /// Absent for decisions made without any consent on record.
    pub consent_uuid: Option<ConsentUuid>,

    pub user_id: String,
    pub timestamp: Timestamp,
    pub details: Value,
    pub prev_hash: Option<String>,
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_parse_their_own_tokens() -> Result<(), UnknownAuditEventType> {
        for event_type in AuditEventType::ALL {
            assert_eq!(event_type.as_str().parse::<AuditEventType>()?, event_type);
        }

        Ok(())
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!("CONSENT_DELETED".parse::<AuditEventType>().is_err());
    }
}
