//! Audit ledger service.

use async_trait::async_trait;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        audit::{
            chain::{ChainVerification, verify_chain},
            errors::AuditError,
            records::AuditRecord,
            repository::PgAuditRepository,
        },
        consents::records::ConsentUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgAuditService {
    db: Db,
    repository: PgAuditRepository,
}

impl PgAuditService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuditRepository::new(),
        }
    }
}

#[async_trait]
impl AuditService for PgAuditService {
    async fn list_entries(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let mut tx = self.db.begin_transaction().await?;

        let entries = self.repository.list_entries(&mut tx).await?;

        tx.commit().await?;

        Ok(entries)
    }

    async fn list_consent_entries(
        &self,
        consent: ConsentUuid,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let mut tx = self.db.begin_transaction().await?;

        let entries = self
            .repository
            .list_consent_entries(&mut tx, consent)
            .await?;

        tx.commit().await?;

        Ok(entries)
    }

    async fn verify(&self) -> Result<ChainVerification, AuditError> {
        let entries = self.list_entries().await?;

        let verification = verify_chain(&entries)?;

        match verification.first_break {
            None => info!(entries = verification.entries, "audit chain intact"),
            Some(chain_break) => warn!(
                entries = verification.entries,
                index = chain_break.index,
                audit_uuid = %chain_break.audit_uuid,
                kind = chain_break.kind.as_str(),
                "audit chain broken"
            ),
        }

        Ok(verification)
    }
}

#[automock]
#[async_trait]
pub trait AuditService: Send + Sync {
    /// Every ledger entry in chain order.
    async fn list_entries(&self) -> Result<Vec<AuditRecord>, AuditError>;

    /// Entries recorded against one consent version, in chain order.
    async fn list_consent_entries(
        &self,
        consent: ConsentUuid,
    ) -> Result<Vec<AuditRecord>, AuditError>;

    /// Recompute the whole chain and report the first divergent entry, if any.
    async fn verify(&self) -> Result<ChainVerification, AuditError>;
}
