//! Consent Data

use std::collections::BTreeSet;

use jiff::Timestamp;

use crate::{domain::consents::errors::ConsentsServiceError, policy::ProcessingScope};

/// Longest accepted user identifier, in characters.
pub const MAX_USER_ID_CHARS: usize = 500;

/// Joins `user_id` and `purpose` in a consent group id, so it cannot appear in a user id.
pub const GROUP_ID_SEPARATOR: char = ':';

/// New Consent Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewConsent {
    pub user_id: String,
    pub purpose: String,
    pub data_types: Vec<String>,
    pub valid_until: Timestamp,
}

impl NewConsent {
    /// Check every field, returning the data types as a set.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentsServiceError::InvalidInput`] naming the first bad field.
    pub fn validate(&self, now: Timestamp) -> Result<BTreeSet<String>, ConsentsServiceError> {
        validate_subject(&self.user_id, &self.purpose)?;

        if self.data_types.is_empty() {
            return Err(invalid("data_types cannot be empty"));
        }

        let mut data_types = BTreeSet::new();

        for data_type in &self.data_types {
            validate_identifier("data_types", data_type)?;
            data_types.insert(data_type.clone());
        }

        if self.valid_until <= now {
            return Err(invalid("valid_until must be in the future"));
        }

        Ok(data_types)
    }
}

/// Processing Request Data
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRequest {
    pub user_id: String,
    pub purpose: String,
    pub data_types: Vec<String>,

    /// Consent version the caller resolved earlier, for replay protection.
    pub version: Option<u32>,
}

impl ProcessingRequest {
    /// Check the request shape.
    ///
    /// An empty `data_types` list is left to the policy engine so the denial is audited.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentsServiceError::InvalidInput`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConsentsServiceError> {
        validate_subject(&self.user_id, &self.purpose)?;

        for data_type in &self.data_types {
            validate_identifier("data_types", data_type)?;
        }

        Ok(())
    }

    #[must_use]
    pub fn scope(&self) -> ProcessingScope {
        ProcessingScope {
            purpose: self.purpose.clone(),
            data_types: self.data_types.clone(),
            version: self.version,
        }
    }
}

/// Check a `(user, purpose)` pair used to address a consent group.
///
/// # Errors
///
/// Returns [`ConsentsServiceError::InvalidInput`] naming the first bad field.
pub fn validate_subject(user_id: &str, purpose: &str) -> Result<(), ConsentsServiceError> {
    validate_identifier("user_id", user_id)?;
    validate_identifier("purpose", purpose)?;

    if user_id.contains(GROUP_ID_SEPARATOR) {
        return Err(invalid(format!(
            "user_id cannot contain '{GROUP_ID_SEPARATOR}'"
        )));
    }

    if user_id.chars().count() > MAX_USER_ID_CHARS {
        return Err(invalid(format!(
            "user_id cannot exceed {MAX_USER_ID_CHARS} characters"
        )));
    }

    Ok(())
}

fn validate_identifier(field: &str, value: &str) -> Result<(), ConsentsServiceError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} cannot be empty")));
    }

    if value.contains('\0') {
        return Err(invalid(format!("{field} contains invalid characters")));
    }

    Ok(())
}

fn invalid(reason: impl Into<String>) -> ConsentsServiceError {
    ConsentsServiceError::InvalidInput(reason.into())
}
