//! Consents Repository

use std::collections::BTreeSet;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};

use crate::{
    approvals::{ApprovalToken, IssuedApprovalToken},
    domain::consents::records::{ConsentGroupId, ConsentRecord, ConsentStatus, ConsentUuid},
};

const NEXT_GROUP_VERSION_SQL: &str = include_str!("sql/next_group_version.sql");
const CREATE_CONSENT_SQL: &str = include_str!("sql/create_consent.sql");
const LOCK_GROUP_SQL: &str = include_str!("sql/lock_group.sql");
const FIND_TOKEN_GROUP_SQL: &str = include_str!("sql/find_token_group.sql");
const LOCK_REQUESTED_BY_TOKEN_SQL: &str = include_str!("sql/lock_requested_by_token.sql");
const LOCK_GROUP_CONSENTS_SQL: &str = include_str!("sql/lock_group_consents.sql");
const LOCK_LATEST_ACTIVE_CONSENT_SQL: &str = include_str!("sql/lock_latest_active_consent.sql");
const TRANSITION_CONSENT_SQL: &str = include_str!("sql/transition_consent.sql");
const EXPIRE_CONSENT_IF_DUE_SQL: &str = include_str!("sql/expire_consent_if_due.sql");
const GET_CONSENT_SQL: &str = include_str!("sql/get_consent.sql");
const RESOLVE_CONSENT_SQL: &str = include_str!("sql/resolve_consent.sql");
const LIST_GROUP_CONSENTS_SQL: &str = include_str!("sql/list_group_consents.sql");
const SWEEP_EXPIRE_ACTIVE_SQL: &str = include_str!("sql/sweep_expire_active.sql");
const SWEEP_REJECT_REQUESTED_SQL: &str = include_str!("sql/sweep_reject_requested.sql");

/// Row values for a new consent version.
#[derive(Debug)]
pub(crate) struct ConsentInsert<'a> {
    pub(crate) uuid: ConsentUuid,
    pub(crate) group_id: &'a ConsentGroupId,
    pub(crate) version: u32,
    pub(crate) user_id: &'a str,
    pub(crate) purpose: &'a str,
    pub(crate) data_types: &'a BTreeSet<String>,
    pub(crate) valid_until: Timestamp,
    pub(crate) status: ConsentStatus,
    pub(crate) approval: Option<&'a IssuedApprovalToken>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgConsentsRepository;

impl PgConsentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Bump the group's version counter, creating the group on first use.
    ///
    /// The group row stays locked until the transaction ends.
    pub(crate) async fn next_version(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group: &ConsentGroupId,
    ) -> Result<u32, sqlx::Error> {
        let version: i32 = query_scalar(NEXT_GROUP_VERSION_SQL)
            .bind(group.as_str())
            .fetch_one(&mut **tx)
            .await?;

        u32::try_from(version).map_err(|e| sqlx::Error::ColumnDecode {
            index: "last_version".to_string(),
            source: Box::new(e),
        })
    }

    pub(crate) async fn create_consent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: ConsentInsert<'_>,
    ) -> Result<ConsentRecord, sqlx::Error> {
        let version = i32::try_from(consent.version).map_err(|e| sqlx::Error::ColumnDecode {
            index: "version".to_string(),
            source: Box::new(e),
        })?;

        let data_types: Vec<&str> = consent.data_types.iter().map(String::as_str).collect();

        query_as::<Postgres, ConsentRecord>(CREATE_CONSENT_SQL)
            .bind(consent.uuid.into_uuid())
            .bind(consent.group_id.as_str())
            .bind(version)
            .bind(consent.user_id)
            .bind(consent.purpose)
            .bind(data_types)
            .bind(SqlxTimestamp::from(consent.valid_until))
            .bind(consent.status.as_str())
            .bind(consent.approval.map(|issued| issued.token.as_str()))
            .bind(
                consent
                    .approval
                    .map(|issued| SqlxTimestamp::from(issued.expires_at)),
            )
            .fetch_one(&mut **tx)
            .await
    }

    /// Lock the group row. Returns `false` when the group has never had a consent.
    pub(crate) async fn lock_group(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group: &ConsentGroupId,
    ) -> Result<bool, sqlx::Error> {
        let locked: Option<String> = query_scalar(LOCK_GROUP_SQL)
            .bind(group.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(locked.is_some())
    }

    /// Unlocked lookup of the group a token belongs to.
    pub(crate) async fn find_token_group(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: &ApprovalToken,
    ) -> Result<Option<ConsentGroupId>, sqlx::Error> {
        let group: Option<String> = query_scalar(FIND_TOKEN_GROUP_SQL)
            .bind(token.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(group.map(ConsentGroupId::from))
    }

    /// Lock the `REQUESTED` row carrying `token`, if its approval window is still open.
    pub(crate) async fn lock_requested_by_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: &ApprovalToken,
        now: Timestamp,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(LOCK_REQUESTED_BY_TOKEN_SQL)
            .bind(token.as_str())
            .bind(SqlxTimestamp::from(now))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn lock_group_consents(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group: &ConsentGroupId,
        status: ConsentStatus,
    ) -> Result<Vec<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(LOCK_GROUP_CONSENTS_SQL)
            .bind(group.as_str())
            .bind(status.as_str())
            .fetch_all(&mut **tx)
            .await
    }

    /// Lock the group's highest `ACTIVE` version, whether or not it has lapsed.
    pub(crate) async fn lock_latest_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group: &ConsentGroupId,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(LOCK_LATEST_ACTIVE_CONSENT_SQL)
            .bind(group.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Move a consent from `from` to `to`, clearing any approval token.
    ///
    /// Returns `None` when the consent is not in `from`.
    pub(crate) async fn transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: ConsentUuid,
        from: ConsentStatus,
        to: ConsentStatus,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        debug_assert!(from.can_transition_to(to), "{from} -> {to}");

        query_as::<Postgres, ConsentRecord>(TRANSITION_CONSENT_SQL)
            .bind(consent.into_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn expire_if_due(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: ConsentUuid,
        now: Timestamp,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(EXPIRE_CONSENT_IF_DUE_SQL)
            .bind(consent.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_consent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: ConsentUuid,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(GET_CONSENT_SQL)
            .bind(consent.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn resolve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group: &ConsentGroupId,
        now: Timestamp,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(RESOLVE_CONSENT_SQL)
            .bind(group.as_str())
            .bind(SqlxTimestamp::from(now))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_group_consents(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group: &ConsentGroupId,
    ) -> Result<Vec<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(LIST_GROUP_CONSENTS_SQL)
            .bind(group.as_str())
            .fetch_all(&mut **tx)
            .await
    }

    /// Expire every lapsed `ACTIVE` consent not locked by another transaction.
    pub(crate) async fn sweep_expire_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<Vec<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(SWEEP_EXPIRE_ACTIVE_SQL)
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut **tx)
            .await
    }

    /// Reject every stale `REQUESTED` consent not locked by another transaction.
    pub(crate) async fn sweep_reject_requested(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<Vec<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(SWEEP_REJECT_REQUESTED_SQL)
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ConsentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let version_i32: i32 = row.try_get("version")?;

        let version = u32::try_from(version_i32).map_err(|e| sqlx::Error::ColumnDecode {
            index: "version".to_string(),
            source: Box::new(e),
        })?;

        let status: String = row.try_get("status")?;

        let status = status
            .parse::<ConsentStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })?;

        let data_types: Vec<String> = row.try_get("data_types")?;

        Ok(Self {
            uuid: ConsentUuid::from_uuid(row.try_get("uuid")?),
            group_id: ConsentGroupId::from(row.try_get::<String, _>("consent_group_id")?),
            version,
            user_id: row.try_get("user_id")?,
            purpose: row.try_get("purpose")?,
            data_types: data_types.into_iter().collect(),
            valid_until: row.try_get::<SqlxTimestamp, _>("valid_until")?.to_jiff(),
            status,
            approval_token: row
                .try_get::<Option<String>, _>("approval_token")?
                .map(ApprovalToken::new),
            approval_expires_at: row
                .try_get::<Option<SqlxTimestamp>, _>("approval_expires_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
