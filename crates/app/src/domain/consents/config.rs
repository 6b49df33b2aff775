//! Consent lifecycle settings.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::approvals::ApprovalTokenIssuer;

/// How newly created consents enter the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalMode {
    /// Created `REQUESTED` with an approval token.
    #[default]
    Manual,

    /// Created `ACTIVE`, superseding the group's current consent.
    Auto,
}

impl ApprovalMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown approval mode `{0}`, expected `manual` or `auto`")]
pub struct UnknownApprovalMode(pub String);

impl FromStr for ApprovalMode {
    type Err = UnknownApprovalMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            _ => Err(UnknownApprovalMode(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsentsConfig {
    pub approval_mode: ApprovalMode,
    pub issuer: ApprovalTokenIssuer,
}
