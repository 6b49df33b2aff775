//! Consent Records

use std::{collections::BTreeSet, fmt, str::FromStr};

use jiff::Timestamp;
use thiserror::Error;

use crate::{approvals::ApprovalToken, uuids::TypedUuid};

/// Consent UUID
pub type ConsentUuid = TypedUuid<ConsentRecord>;

/// Identifier shared by every version of one `(user, purpose)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsentGroupId(String);

impl ConsentGroupId {
    #[must_use]
    pub fn new(user_id: &str, purpose: &str) -> Self {
        Self(format!("{user_id}:{purpose}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConsentGroupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConsentGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a consent version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentStatus {
    Requested,
    Active,
    Rejected,
    Revoked,
    Expired,
}

impl ConsentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "REQUESTED",
            Self::Active => "ACTIVE",
            Self::Rejected => "REJECTED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Terminal states accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Revoked | Self::Expired)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Active | Self::Rejected)
                | (Self::Active, Self::Revoked | Self::Expired)
        )
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown consent status `{0}`")]
pub struct UnknownConsentStatus(pub String);

impl FromStr for ConsentStatus {
    type Err = UnknownConsentStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "REQUESTED" => Ok(Self::Requested),
            "ACTIVE" => Ok(Self::Active),
            "REJECTED" => Ok(Self::Rejected),
            "REVOKED" => Ok(Self::Revoked),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(UnknownConsentStatus(other.to_string())),
        }
    }
}

/// Consent Record
///
/// One row per version. Only `status`, the approval token fields and
/// `updated_at` change after creation.
#[derive(Debug, Clone)]
pub struct ConsentRecord {
    pub uuid: ConsentUuid,
    pub group_id: ConsentGroupId,
    pub version: u32,
    pub user_id: String,
    pub purpose: String,
    pub data_types: BTreeSet<String>,
    pub valid_until: Timestamp,
    pub status: ConsentStatus,
    pub approval_token: Option<ApprovalToken>,
    pub approval_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConsentRecord {
    /// Whether `valid_until` has passed as of `now`.
    #[must_use]
    pub fn is_lapsed(&self, now: Timestamp) -> bool {
        self.valid_until <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_joins_user_and_purpose() {
        assert_eq!(
            ConsentGroupId::new("user-1", "marketing").as_str(),
            "user-1:marketing"
        );
    }

    #[test]
    fn status_parses_its_own_tokens() -> Result<(), UnknownConsentStatus> {
        for status in [
            ConsentStatus::Requested,
            ConsentStatus::Active,
            ConsentStatus::Rejected,
            ConsentStatus::Revoked,
            ConsentStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<ConsentStatus>()?, status);
        }

        assert!("active".parse::<ConsentStatus>().is_err());

        Ok(())
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [
            ConsentStatus::Requested,
            ConsentStatus::Active,
            ConsentStatus::Rejected,
            ConsentStatus::Revoked,
            ConsentStatus::Expired,
        ];

        for from in all.iter().copied().filter(|status| status.is_terminal()) {
            for to in all {
                assert!(
                    !from.can_transition_to(to),
                    "{from} must not transition to {to}"
                );
            }
        }
    }

    #[test]
    fn lifecycle_edges() {
        assert!(ConsentStatus::Requested.can_transition_to(ConsentStatus::Active));
        assert!(ConsentStatus::Requested.can_transition_to(ConsentStatus::Rejected));
        assert!(ConsentStatus::Active.can_transition_to(ConsentStatus::Revoked));
        assert!(ConsentStatus::Active.can_transition_to(ConsentStatus::Expired));
        assert!(!ConsentStatus::Requested.can_transition_to(ConsentStatus::Revoked));
        assert!(!ConsentStatus::Active.can_transition_to(ConsentStatus::Rejected));
    }
}
