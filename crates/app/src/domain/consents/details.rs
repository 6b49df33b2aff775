//! Ledger payloads for consent events.

use serde_json::{Value, json};

use crate::{
    domain::consents::{data::ProcessingRequest, records::ConsentRecord},
    policy::DenyReason,
};

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Via {
    Api,
    Semantic,
    Token,
    ScheduledJob,
    ProcessingCheck,
    Superseded,
}

impl Via {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::Semantic => "SEMANTIC",
            Self::Token => "TOKEN",
            Self::ScheduledJob => "SCHEDULED_JOB",
            Self::ProcessingCheck => "PROCESSING_CHECK",
            Self::Superseded => "SUPERSEDED",
        }
    }
}

pub(crate) const VALIDITY_ELAPSED: &str = "VALIDITY_ELAPSED";
pub(crate) const APPROVAL_EXPIRED: &str = "APPROVAL_EXPIRED";

pub(crate) fn created(consent: &ConsentRecord) -> Value {
    let mut details = json!({
        "purpose": consent.purpose,
        "version": consent.version,
        "dataTypes": consent.data_types,
        "validUntil": consent.valid_until.to_string(),
        "approvalRequired": consent.approval_token.is_some(),
    });

    if let (Some(expires_at), Value::Object(map)) = (consent.approval_expires_at, &mut details) {
        map.insert(
            "approvalExpiresAt".to_string(),
            Value::String(expires_at.to_string()),
        );
    }

    details
}

pub(crate) fn transition(consent: &ConsentRecord, via: Via, reason: Option<&str>) -> Value {
    let mut details = json!({
        "purpose": consent.purpose,
        "version": consent.version,
        "status": consent.status.as_str(),
        "via": via.as_str(),
    });

    if let (Some(reason), Value::Object(map)) = (reason, &mut details) {
        map.insert("reason".to_string(), Value::String(reason.to_string()));
    }

    details
}

pub(crate) fn expired(consent: &ConsentRecord, via: Via) -> Value {
    json!({
        "purpose": consent.purpose,
        "version": consent.version,
        "status": consent.status.as_str(),
        "validUntil": consent.valid_until.to_string(),
        "via": via.as_str(),
    })
}

pub(crate) fn processing(
    request: &ProcessingRequest,
    consent: Option<&ConsentRecord>,
    reason: Option<&DenyReason>,
) -> Value {
    let mut details = json!({
        "purpose": request.purpose,
        "requestedDataTypes": request.data_types,
    });

    if let Value::Object(map) = &mut details {
        if let Some(consent) = consent {
            map.insert("version".to_string(), json!(consent.version));
            map.insert("consentedDataTypes".to_string(), json!(consent.data_types));
        }

        if let Some(version) = request.version {
            map.insert("requestedVersion".to_string(), json!(version));
        }

        if let Some(reason) = reason {
            map.insert("reason".to_string(), json!(reason.code()));

            if let Some(data_type) = reason.data_type() {
                map.insert("dataType".to_string(), json!(data_type));
            }
        }
    }

    details
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use jiff::Timestamp;

    use crate::domain::consents::records::{ConsentGroupId, ConsentStatus, ConsentUuid};

    use super::*;

    fn consent() -> ConsentRecord {
        ConsentRecord {
            uuid: ConsentUuid::new(),
            group_id: ConsentGroupId::new("user-1", "marketing"),
            version: 2,
            user_id: "user-1".to_string(),
            purpose: "marketing".to_string(),
            data_types: BTreeSet::from(["email".to_string()]),
            valid_until: Timestamp::UNIX_EPOCH,
            status: ConsentStatus::Revoked,
            approval_token: None,
            approval_expires_at: None,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn transition_details_name_the_cause() {
        assert_eq!(
            transition(&consent(), Via::Semantic, None),
            json!({
                "purpose": "marketing",
                "version": 2,
                "status": "REVOKED",
                "via": "SEMANTIC",
            })
        );
    }

    #[test]
    fn denial_details_name_the_offending_type() {
        let request = ProcessingRequest {
            user_id: "user-1".to_string(),
            purpose: "marketing".to_string(),
            data_types: vec!["email".to_string(), "ssn".to_string()],
            version: None,
        };

        let details = processing(
            &request,
            Some(&consent()),
            Some(&DenyReason::DataTypeNotConsented("ssn".to_string())),
        );

        assert_eq!(details["reason"], "DATA_TYPE_NOT_CONSENTED");
        assert_eq!(details["dataType"], "ssn");
        assert_eq!(details["consentedDataTypes"], json!(["email"]));
        assert_eq!(details["version"], 2);
    }
}
