//! Approval token generation and expiry.

use std::fmt;

use jiff::{SignedDuration, Timestamp};
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroize;

/// Number of random bytes encoded in a token.
pub const APPROVAL_TOKEN_BYTES: usize = 32;

/// Default approval window, in hours.
pub const DEFAULT_APPROVAL_TOKEN_TTL_HOURS: u32 = 24;

const APPROVAL_TOKEN_HEX_CHARS: usize = APPROVAL_TOKEN_BYTES * 2;

/// Opaque single-use approval token.
#[derive(Clone, PartialEq, Eq)]
pub struct ApprovalToken(String);

impl ApprovalToken {
    /// Wrap a token received from a caller.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(mut self) -> String {
        std::mem::take(&mut self.0)
    }

    /// Whether the token has the shape of an issued token.
    ///
    /// Malformed tokens can be rejected without a storage round trip.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == APPROVAL_TOKEN_HEX_CHARS
            && self
                .0
                .bytes()
                .all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Debug for ApprovalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApprovalToken(**redacted**)")
    }
}

impl Drop for ApprovalToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A freshly issued token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedApprovalToken {
    pub token: ApprovalToken,
    pub expires_at: Timestamp,
}

/// Issues approval tokens with a fixed time-to-live.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalTokenIssuer {
    ttl: SignedDuration,
}

impl ApprovalTokenIssuer {
    #[must_use]
    pub const fn new(ttl: SignedDuration) -> Self {
        Self { ttl }
    }

    #[must_use]
    pub fn from_hours(hours: u32) -> Self {
        Self::new(SignedDuration::from_hours(i64::from(hours)))
    }

    #[must_use]
    pub const fn ttl(&self) -> SignedDuration {
        self.ttl
    }

    /// Issue a new token valid from `now` for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns an error when the expiry overflows the supported timestamp range.
    pub fn issue(&self, now: Timestamp) -> Result<IssuedApprovalToken, jiff::Error> {
        Ok(IssuedApprovalToken {
            token: generate_approval_token(),
            expires_at: now.checked_add(self.ttl)?,
        })
    }
}

impl Default for ApprovalTokenIssuer {
    fn default() -> Self {
        Self::from_hours(DEFAULT_APPROVAL_TOKEN_TTL_HOURS)
    }
}

#[must_use]
pub fn generate_approval_token() -> ApprovalToken {
    let mut bytes = [0_u8; APPROVAL_TOKEN_BYTES];

    OsRng.fill_bytes(&mut bytes);

    let token = ApprovalToken(hex::encode(bytes));

    bytes.zeroize();

    token
}
