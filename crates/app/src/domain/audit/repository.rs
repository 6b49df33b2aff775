//! Audit Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use serde_json::Value;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    audit::{
        chain::{HashInput, compute_hash, next_timestamp},
        data::NewAuditEntry,
        errors::AuditError,
        records::{AuditEventType, AuditRecord, AuditUuid},
    },
    consents::records::ConsentUuid,
};

const LOCK_CHAIN_HEAD_SQL: &str = include_str!("sql/lock_chain_head.sql");
const CREATE_AUDIT_LOG_SQL: &str = include_str!("sql/create_audit_log.sql");
const ADVANCE_CHAIN_HEAD_SQL: &str = include_str!("sql/advance_chain_head.sql");
const LIST_AUDIT_LOGS_SQL: &str = include_str!("sql/list_audit_logs.sql");
const LIST_CONSENT_AUDIT_LOGS_SQL: &str = include_str!("sql/list_consent_audit_logs.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgAuditRepository;

impl PgAuditRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Link `entry` onto the chain tail inside the caller's transaction.
    ///
    /// Holds the chain head lock until the transaction ends, so callers must
    /// finish locking consent rows before appending.
    pub(crate) async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: NewAuditEntry,
    ) -> Result<AuditRecord, AuditError> {
        let head: Option<(Option<String>, Option<SqlxTimestamp>)> =
            query_as(LOCK_CHAIN_HEAD_SQL)
                .fetch_optional(&mut **tx)
                .await?;

        let Some((prev_hash, last_timestamp)) = head else {
            return Err(AuditError::MissingChainHead);
        };

        let timestamp = next_timestamp(
            Timestamp::now(),
            last_timestamp.map(SqlxTimestamp::to_jiff),
        )
        .map_err(AuditError::Timestamp)?;

        let uuid = AuditUuid::new();

        let hash = compute_hash(&HashInput {
            prev_hash: prev_hash.as_deref(),
            uuid,
            event_type: entry.event_type,
            consent_uuid: entry.consent_uuid,
            user_id: &entry.user_id,
            timestamp,
            details: &entry.details,
        })?;

        let record = query_as::<Postgres, AuditRecord>(CREATE_AUDIT_LOG_SQL)
            .bind(uuid.into_uuid())
            .bind(entry.event_type.as_str())
            .bind(entry.consent_uuid.map(ConsentUuid::into_uuid))
            .bind(&entry.user_id)
            .bind(SqlxTimestamp::from(timestamp))
            .bind(&entry.details)
            .bind(prev_hash.as_deref())
            .bind(&hash)
            .fetch_one(&mut **tx)
            .await?;

        query(ADVANCE_CHAIN_HEAD_SQL)
            .bind(&hash)
            .bind(SqlxTimestamp::from(timestamp))
            .execute(&mut **tx)
            .await?;

        Ok(record)
    }

    pub(crate) async fn list_entries(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let entries = query_as::<Postgres, AuditRecord>(LIST_AUDIT_LOGS_SQL)
            .fetch_all(&mut **tx)
            .await?;

        Ok(entries)
    }

    pub(crate) async fn list_consent_entries(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: ConsentUuid,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let entries = query_as::<Postgres, AuditRecord>(LIST_CONSENT_AUDIT_LOGS_SQL)
            .bind(consent.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(entries)
    }
}

impl<'r> FromRow<'r, PgRow> for AuditRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let event_type: String = row.try_get("event_type")?;

        let event_type =
            event_type
                .parse::<AuditEventType>()
                .map_err(|e| sqlx::Error::ColumnDecode {
                    index: "event_type".to_string(),
                    source: Box::new(e),
                })?;

        Ok(Self {
            uuid: AuditUuid::from_uuid(row.try_get("uuid")?),
            sequence: row.try_get("sequence")?,
            event_type,
            consent_uuid: row
                .try_get::<Option<Uuid>, _>("consent_uuid")?
                .map(ConsentUuid::from_uuid),
            user_id: row.try_get("user_id")?,
            timestamp: row.try_get::<SqlxTimestamp, _>("timestamp")?.to_jiff(),
            details: row.try_get::<Value, _>("details")?,
            prev_hash: row.try_get("prev_hash")?,
            hash: row.try_get("hash")?,
        })
    }
}
