//! Hash chain construction and verification.
//!
//! Each entry hashes its predecessor's hash together with its own fields,
//! so any insertion, deletion, reordering or edit changes every later link.

use jiff::{SignedDuration, Timestamp};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::{
    audit::records::{AuditEventType, AuditRecord, AuditUuid},
    consents::records::ConsentUuid,
};

/// Separates hashed fields so adjacent values cannot run together.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Fields that make up an entry's digest.
#[derive(Debug, Clone, Copy)]
pub struct HashInput<'a> {
    pub prev_hash: Option<&'a str>,
    pub uuid: AuditUuid,
    pub event_type: AuditEventType,
    pub consent_uuid: Option<ConsentUuid>,
    pub user_id: &'a str,
    pub timestamp: Timestamp,
    pub details: &'a Value,
}

impl<'a> From<&'a AuditRecord> for HashInput<'a> {
    fn from(record: &'a AuditRecord) -> Self {
        Self {
            prev_hash: record.prev_hash.as_deref(),
            uuid: record.uuid,
            event_type: record.event_type,
            consent_uuid: record.consent_uuid,
            user_id: &record.user_id,
            timestamp: record.timestamp,
            details: &record.details,
        }
    }
}

/// Hex-encoded SHA-256 digest of an entry.
///
/// # Errors
///
/// Returns an error when `details` cannot be canonicalized.
pub fn compute_hash(input: &HashInput<'_>) -> Result<String, serde_json::Error> {
    let consent_uuid = input
        .consent_uuid
        .map(|uuid| uuid.to_string())
        .unwrap_or_default();

    let fields = [
        input.prev_hash.unwrap_or_default().to_string(),
        input.uuid.to_string(),
        input.event_type.as_str().to_string(),
        consent_uuid,
        input.user_id.to_string(),
        input.timestamp.to_string(),
        canonical_json(input.details)?,
    ];

    let mut hasher = Sha256::new();

    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            hasher.update([FIELD_SEPARATOR]);
        }

        hasher.update(field.as_bytes());
    }

    Ok(hex::encode(hasher.finalize()))
}

/// RFC 8785 canonical form of `value`: sorted keys, no whitespace, normalized numbers.
///
/// # Errors
///
/// Returns an error when serialization fails.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_jcs::to_string(value)
}

/// Timestamp for the next entry: strictly after the tail, at microsecond precision.
///
/// # Errors
///
/// Returns an error when the result leaves the supported timestamp range.
pub fn next_timestamp(
    now: Timestamp,
    last: Option<Timestamp>,
) -> Result<Timestamp, jiff::Error> {
    let now = Timestamp::from_microsecond(now.as_microsecond())?;

    let Some(last) = last else {
        return Ok(now);
    };

    let floor = last.checked_add(SignedDuration::from_micros(1))?;

    Ok(now.max(floor))
}

/// How a chain entry diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainBreakKind {
    /// The stored hash does not match the entry's recomputed digest.
    HashMismatch,

    /// The entry does not point at its predecessor's hash.
    LinkMismatch,
}

impl ChainBreakKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HashMismatch => "HASH_MISMATCH",
            Self::LinkMismatch => "LINK_MISMATCH",
        }
    }
}

/// The first entry at which verification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainBreak {
    pub index: usize,
    pub audit_uuid: AuditUuid,
    pub kind: ChainBreakKind,
}

/// Result of walking the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainVerification {
    pub entries: usize,
    pub first_break: Option<ChainBreak>,
}

impl ChainVerification {
    #[must_use]
    pub const fn is_intact(&self) -> bool {
        self.first_break.is_none()
    }
}

/// Walk `entries` in ledger order, stopping at the first divergence.
///
/// # Errors
///
/// Returns an error when an entry's details cannot be canonicalized.
pub fn verify_chain(entries: &[AuditRecord]) -> Result<ChainVerification, serde_json::Error> {
    let mut expected_prev: Option<&str> = None;

    for (index, entry) in entries.iter().enumerate() {
        let kind = if entry.prev_hash.as_deref() != expected_prev {
            Some(ChainBreakKind::LinkMismatch)
        } else if compute_hash(&HashInput::from(entry))? != entry.hash {
            Some(ChainBreakKind::HashMismatch)
        } else {
            None
        };

        if let Some(kind) = kind {
            return Ok(ChainVerification {
                entries: entries.len(),
                first_break: Some(ChainBreak {
                    index,
                    audit_uuid: entry.uuid,
                    kind,
                }),
            });
        }

        expected_prev = Some(&entry.hash);
    }

    Ok(ChainVerification {
        entries: entries.len(),
        first_break: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ts(value: &str) -> Timestamp {
        value.parse().expect("valid timestamp")
    }

    fn chain(len: usize) -> Vec<AuditRecord> {
        let mut entries: Vec<AuditRecord> = Vec::with_capacity(len);
        let mut timestamp = ts("2026-03-01T12:00:00Z");

        for index in 0..len {
            let prev_hash = entries.last().map(|entry| entry.hash.clone());
            let details = json!({ "version": index + 1, "purpose": "marketing" });
            let uuid = AuditUuid::new();
            let consent_uuid = (index % 2 == 0).then(ConsentUuid::new);

            let hash = compute_hash(&HashInput {
                prev_hash: prev_hash.as_deref(),
                uuid,
                event_type: AuditEventType::ConsentRequested,
                consent_uuid,
                user_id: "user-1",
                timestamp,
                details: &details,
            })
            .expect("hashable details");

            entries.push(AuditRecord {
                uuid,
                sequence: i64::try_from(index).expect("small index") + 1,
                event_type: AuditEventType::ConsentRequested,
                consent_uuid,
                user_id: "user-1".to_string(),
                timestamp,
                details,
                prev_hash,
                hash,
            });

            timestamp = next_timestamp(timestamp, Some(timestamp)).expect("in range");
        }

        entries
    }

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let value = json!({
            "b": 1,
            "a": { "z": [3, { "y": true, "x": null }], "c": "q\"uote" },
        });

        assert_eq!(
            canonical_json(&value).expect("canonical"),
            r#"{"a":{"c":"q\"uote","z":[3,{"x":null,"y":true}]},"b":1}"#
        );
    }

    #[test]
    fn canonical_json_normalizes_numbers() {
        assert_eq!(
            canonical_json(&json!({ "n": 100.0, "m": 1e2 })).expect("canonical"),
            r#"{"m":100,"n":100}"#
        );
    }

    #[test]
    fn equivalent_numbers_hash_identically() {
        let integral = json!({ "version": 100 });
        let float = json!({ "version": 100.0 });
        let input = HashInput {
            prev_hash: None,
            uuid: AuditUuid::new(),
            event_type: AuditEventType::ConsentRequested,
            consent_uuid: None,
            user_id: "user-1",
            timestamp: ts("2026-03-01T12:00:00Z"),
            details: &integral,
        };

        assert_eq!(
            compute_hash(&input).expect("hash"),
            compute_hash(&HashInput {
                details: &float,
                ..input
            })
            .expect("hash")
        );
    }

    #[test]
    fn hash_is_hex_sha256_and_field_sensitive() {
        let details = json!({ "purpose": "marketing" });
        let input = HashInput {
            prev_hash: None,
            uuid: AuditUuid::new(),
            event_type: AuditEventType::ConsentRevoked,
            consent_uuid: None,
            user_id: "user-1",
            timestamp: ts("2026-03-01T12:00:00Z"),
            details: &details,
        };

        let hash = compute_hash(&input).expect("hash");

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_hash(&input).expect("hash"));

        let other = HashInput {
            user_id: "user-2",
            ..input
        };

        assert_ne!(hash, compute_hash(&other).expect("hash"));
    }

    #[test]
    fn adjacent_fields_do_not_collide() {
        let details = json!({});
        let uuid = AuditUuid::new();
        let timestamp = ts("2026-03-01T12:00:00Z");

        let a = HashInput {
            prev_hash: Some("ab"),
            uuid,
            event_type: AuditEventType::ConsentRevoked,
            consent_uuid: None,
            user_id: "c",
            timestamp,
            details: &details,
        };

        let b = HashInput {
            prev_hash: Some("a"),
            user_id: "bc",
            ..a
        };

        assert_ne!(
            compute_hash(&a).expect("hash"),
            compute_hash(&b).expect("hash")
        );
    }

    #[test]
    fn next_timestamp_is_strictly_increasing() {
        let last = ts("2026-03-01T12:00:00.000005Z");

        assert_eq!(
            next_timestamp(ts("2026-03-01T11:00:00Z"), Some(last)).expect("in range"),
            ts("2026-03-01T12:00:00.000006Z")
        );
        assert_eq!(
            next_timestamp(ts("2026-03-01T12:00:01.123456789Z"), Some(last)).expect("in range"),
            ts("2026-03-01T12:00:01.123456Z")
        );
        assert_eq!(
            next_timestamp(ts("2026-03-01T12:00:00.9999999Z"), None).expect("in range"),
            ts("2026-03-01T12:00:00.999999Z")
        );
    }

    #[test]
    fn untouched_chain_verifies() {
        let entries = chain(5);
        let verification = verify_chain(&entries).expect("verifiable");

        assert!(verification.is_intact());
        assert_eq!(verification.entries, 5);
        assert!(verify_chain(&[]).expect("verifiable").is_intact());
    }

    #[test]
    fn edited_details_break_at_that_entry() {
        let mut entries = chain(4);
        entries[2].details = json!({ "version": 99, "purpose": "marketing" });

        let verification = verify_chain(&entries).expect("verifiable");

        assert_eq!(
            verification.first_break,
            Some(ChainBreak {
                index: 2,
                audit_uuid: entries[2].uuid,
                kind: ChainBreakKind::HashMismatch,
            })
        );
    }

    #[test]
    fn deleted_entry_breaks_the_link() {
        let mut entries = chain(4);
        entries.remove(1);

        let verification = verify_chain(&entries).expect("verifiable");

        assert_eq!(verification.first_break.map(|b| b.index), Some(1));
        assert_eq!(
            verification.first_break.map(|b| b.kind),
            Some(ChainBreakKind::LinkMismatch)
        );
    }

    #[test]
    fn reordered_entries_break_the_link() {
        let mut entries = chain(4);
        entries.swap(1, 2);

        assert_eq!(
            verify_chain(&entries).expect("verifiable").first_break.map(|b| b.index),
            Some(1)
        );
    }

    #[test]
    fn first_entry_must_not_have_a_predecessor() {
        let mut entries = chain(2);
        entries[0].prev_hash = Some("00".repeat(32));

        assert_eq!(
            verify_chain(&entries).expect("verifiable").first_break.map(|b| (b.index, b.kind)),
            Some((0, ChainBreakKind::LinkMismatch))
        );
    }

    #[test]
    fn rehashed_edit_still_breaks_the_next_link() {
        let mut entries = chain(3);
        entries[1].user_id = "mallory".to_string();
        entries[1].hash = compute_hash(&HashInput::from(&entries[1])).expect("hash");

        assert_eq!(
            verify_chain(&entries).expect("verifiable").first_break.map(|b| (b.index, b.kind)),
            Some((2, ChainBreakKind::LinkMismatch))
        );
    }
}
