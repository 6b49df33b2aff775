//! Consent Operation Outcomes

use crate::{
    domain::{audit::records::AuditUuid, consents::records::ConsentRecord},
    policy::PolicyDecision,
};

/// Result of presenting an approval token.
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    Approved {
        consent: ConsentRecord,

        /// Previously `ACTIVE` versions the approval superseded.
        revoked: Vec<ConsentRecord>,

        /// Other pending requests in the group, closed by the approval.
        rejected: Vec<ConsentRecord>,
    },

    /// The request's validity lapsed before approval, so it was rejected instead.
    NoEffect(ConsentRecord),
}

/// Result of rejecting by token.
#[derive(Debug, Clone)]
pub struct RejectionOutcome {
    pub consent: ConsentRecord,
    pub superseded: Vec<ConsentRecord>,
}

/// Result of revoking whatever is current for a `(user, purpose)` pair.
#[derive(Debug, Clone)]
pub enum RevocationOutcome {
    Revoked(ConsentRecord),
    NoActiveConsent,
}

/// Result of checking a processing request.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub decision: PolicyDecision,

    /// The consent the decision was made against, if one was on record.
    pub consent: Option<ConsentRecord>,

    /// Ledger entry recording the decision.
    pub audit_uuid: AuditUuid,
}

/// Transitions made by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub rejected: usize,
}

impl SweepReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.expired + self.rejected
    }
}
