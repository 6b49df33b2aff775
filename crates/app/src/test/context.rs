//! Test context for service-level integration tests.

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::query;

use crate::{
    database::Db,
    domain::{
        audit::{PgAuditService, records::AuditUuid},
        consents::{ApprovalMode, ConsentsConfig, PgConsentsService, records::ConsentUuid},
    },
};

use super::db::TestDb;

pub struct TestContext {
    pub test_db: TestDb,
    pub db: Db,
    pub consents: PgConsentsService,
    pub audit: PgAuditService,
}

impl TestContext {
    /// Context with consents created `REQUESTED`, awaiting token approval.
    pub async fn new() -> Self {
        Self::with_config(ConsentsConfig::default()).await
    }

    /// Context with consents created directly `ACTIVE`.
    pub async fn auto_approving() -> Self {
        Self::with_config(ConsentsConfig {
            approval_mode: ApprovalMode::Auto,
            ..ConsentsConfig::default()
        })
        .await
    }

    pub async fn with_config(config: ConsentsConfig) -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool().clone());

        Self {
            consents: PgConsentsService::new(db.clone(), config),
            audit: PgAuditService::new(db.clone()),
            db,
            test_db,
        }
    }

    /// Move a consent's validity into the past, as if time had passed.
    pub async fn lapse_validity(&self, consent: ConsentUuid, at: Timestamp) -> Result<(), sqlx::Error> {
        query("UPDATE consents SET valid_until = $2 WHERE uuid = $1")
            .bind(consent.into_uuid())
            .bind(SqlxTimestamp::from(at))
            .execute(self.test_db.pool())
            .await?;

        Ok(())
    }

    /// Move a pending consent's approval deadline into the past.
    pub async fn lapse_approval(&self, consent: ConsentUuid, at: Timestamp) -> Result<(), sqlx::Error> {
        query("UPDATE consents SET approval_expires_at = $2 WHERE uuid = $1")
            .bind(consent.into_uuid())
            .bind(SqlxTimestamp::from(at))
            .execute(self.test_db.pool())
            .await?;

        Ok(())
    }

    /// Run `statement` against one ledger row with the append-only guard lifted.
    pub async fn tamper_with_audit_log(
        &self,
        statement: &str,
        entry: AuditUuid,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.test_db.pool().begin().await?;

        query("ALTER TABLE audit_logs DISABLE TRIGGER audit_logs_append_only")
            .execute(&mut *tx)
            .await?;

        query(statement)
            .bind(entry.into_uuid())
            .execute(&mut *tx)
            .await?;

        query("ALTER TABLE audit_logs ENABLE TRIGGER audit_logs_append_only")
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}
