//! Policy decision engine.
//!
//! Evaluation is a pure function of a resolved consent and a processing
//! scope. Expiry must already have been settled by the caller.

use std::fmt;

use crate::domain::consents::records::{ConsentRecord, ConsentStatus};

/// The scope a caller wants to process data under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingScope {
    pub purpose: String,
    pub data_types: Vec<String>,

    /// Consent version the caller last resolved, if it pins one.
    pub version: Option<u32>,
}

/// Machine-distinguishable reason for refusing a processing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    ConsentNotActive,
    StaleVersion,
    PurposeMismatch,
    NoDataTypesRequested,
    DataTypeNotConsented(String),

    /// No authoritative consent exists for the group.
    NoActiveConsent,

    /// The authoritative consent lapsed and was expired during the check.
    ConsentExpired,
}

impl DenyReason {
    /// Stable token identifying the reason.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConsentNotActive => "CONSENT_NOT_ACTIVE",
            Self::StaleVersion => "STALE_VERSION",
            Self::PurposeMismatch => "PURPOSE_MISMATCH",
            Self::NoDataTypesRequested => "NO_DATA_TYPES_REQUESTED",
            Self::DataTypeNotConsented(_) => "DATA_TYPE_NOT_CONSENTED",
            Self::NoActiveConsent => "NO_ACTIVE_CONSENT",
            Self::ConsentExpired => "CONSENT_EXPIRED",
        }
    }

    /// The offending data type, when the reason names one.
    #[must_use]
    pub fn data_type(&self) -> Option<&str> {
        match self {
            Self::DataTypeNotConsented(data_type) => Some(data_type),
            _ => None,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataTypeNotConsented(data_type) => write!(f, "{}({data_type})", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

/// Outcome of evaluating a processing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(DenyReason),
}

impl PolicyDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Evaluate `scope` against `consent`, stopping at the first failed check.
#[must_use]
pub fn evaluate(consent: &ConsentRecord, scope: &ProcessingScope) -> PolicyDecision {
    if consent.status != ConsentStatus::Active {
        return PolicyDecision::Deny(DenyReason::ConsentNotActive);
    }

    if let Some(version) = scope.version
        && version != consent.version
    {
        return PolicyDecision::Deny(DenyReason::StaleVersion);
    }

    if scope.purpose != consent.purpose {
        return PolicyDecision::Deny(DenyReason::PurposeMismatch);
    }

    if scope.data_types.is_empty() {
        return PolicyDecision::Deny(DenyReason::NoDataTypesRequested);
    }

    if let Some(offending) = scope
        .data_types
        .iter()
        .find(|data_type| !consent.data_types.contains(*data_type))
    {
        return PolicyDecision::Deny(DenyReason::DataTypeNotConsented(offending.clone()));
    }

    PolicyDecision::Allow
}
