//! Consent response models.

use std::string::ToString;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_app::domain::consents::records::ConsentRecord;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ConsentResponse {
    /// Identifier of this consent version
    pub uuid: Uuid,

    /// The `user_id:purpose` group the version belongs to
    pub group_id: String,

    /// Version number within the group, starting at 1
    pub version: u32,

    pub user_id: String,

    pub purpose: String,

    /// Consented data types, sorted
    pub data_types: Vec<String>,

    /// End of the consent's validity
    pub valid_until: String,

    /// Lifecycle status (REQUESTED, ACTIVE, REJECTED, REVOKED, EXPIRED)
    pub status: String,

    /// Deadline for redeeming the approval token, while pending
    pub approval_expires_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

impl From<ConsentRecord> for ConsentResponse {
    fn from(consent: ConsentRecord) -> Self {
        ConsentResponse {
            uuid: consent.uuid.into(),
            group_id: consent.group_id.to_string(),
            version: consent.version,
            user_id: consent.user_id,
            purpose: consent.purpose,
            data_types: consent.data_types.into_iter().collect(),
            valid_until: consent.valid_until.to_string(),
            status: consent.status.as_str().to_string(),
            approval_expires_at: consent.approval_expires_at.as_ref().map(ToString::to_string),
            created_at: consent.created_at.to_string(),
            updated_at: consent.updated_at.to_string(),
        }
    }
}

pub(crate) fn uuids_of(consents: Vec<ConsentRecord>) -> Vec<Uuid> {
    consents
        .into_iter()
        .map(|consent| consent.uuid.into())
        .collect()
}
