//! Consent Lifecycle Config

use clap::Args;

use consent_app::{
    approvals::ApprovalTokenIssuer,
    domain::consents::{ApprovalMode, ConsentsConfig},
};

/// Consent lifecycle settings.
#[derive(Debug, Args)]
pub struct ConsentsSettings {
    /// Hours an approval token stays redeemable
    #[arg(long, env = "APPROVAL_TOKEN_TTL_HOURS", default_value_t = 24_u32)]
    pub approval_token_ttl_hours: u32,

    /// How new consents enter the lifecycle (manual, auto)
    #[arg(long, env = "CONSENT_APPROVAL_MODE", default_value_t = ApprovalMode::Manual)]
    pub approval_mode: ApprovalMode,
}

impl ConsentsSettings {
    #[must_use]
    pub fn to_consents_config(&self) -> ConsentsConfig {
        ConsentsConfig {
            approval_mode: self.approval_mode,
            issuer: ApprovalTokenIssuer::from_hours(self.approval_token_ttl_hours),
        }
    }
}
