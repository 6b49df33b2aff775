//! Consents service.
//!
//! Every state change is written together with its ledger entries in one
//! transaction. Consent rows are always locked before the first append, since
//! appending takes the chain head lock until commit.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};

use crate::{
    approvals::ApprovalToken,
    database::Db,
    domain::{
        audit::{
            data::NewAuditEntry,
            records::{AuditEventType, AuditRecord},
            repository::PgAuditRepository,
        },
        consents::{
            config::{ApprovalMode, ConsentsConfig},
            data::{NewConsent, ProcessingRequest, validate_subject},
            details::{self, APPROVAL_EXPIRED, VALIDITY_ELAPSED, Via},
            errors::ConsentsServiceError,
            outcomes::{
                ApprovalOutcome, ProcessingOutcome, RejectionOutcome, RevocationOutcome,
                SweepReport,
            },
            records::{ConsentGroupId, ConsentRecord, ConsentStatus, ConsentUuid},
            repository::{ConsentInsert, PgConsentsRepository},
        },
    },
    policy::{self, DenyReason, PolicyDecision},
};

#[derive(Debug, Clone)]
pub struct PgConsentsService {
    db: Db,
    config: ConsentsConfig,
    repository: PgConsentsRepository,
    ledger: PgAuditRepository,
}

impl PgConsentsService {
    #[must_use]
    pub fn new(db: Db, config: ConsentsConfig) -> Self {
        Self {
            db,
            config,
            repository: PgConsentsRepository::new(),
            ledger: PgAuditRepository::new(),
        }
    }

    async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entries: Vec<NewAuditEntry>,
    ) -> Result<Vec<AuditRecord>, ConsentsServiceError> {
        let mut recorded = Vec::with_capacity(entries.len());

        for entry in entries {
            let record = self.ledger.append(tx, entry).await?;

            debug!(
                audit_uuid = %record.uuid,
                event_type = %record.event_type,
                "audit entry appended"
            );

            recorded.push(record);
        }

        Ok(recorded)
    }

    async fn record_one(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: NewAuditEntry,
    ) -> Result<AuditRecord, ConsentsServiceError> {
        let mut recorded = self.record(tx, vec![entry]).await?;

        recorded.pop().ok_or(ConsentsServiceError::Conflict)
    }

    /// Transition rows already locked by this transaction.
    async fn transition_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consents: Vec<ConsentRecord>,
        to: ConsentStatus,
    ) -> Result<Vec<ConsentRecord>, ConsentsServiceError> {
        let mut transitioned = Vec::with_capacity(consents.len());

        for consent in consents {
            let updated = self
                .repository
                .transition(tx, consent.uuid, consent.status, to)
                .await?
                .ok_or(ConsentsServiceError::Conflict)?;

            transitioned.push(updated);
        }

        Ok(transitioned)
    }

    /// Lock the token's group and then its pending row.
    async fn lock_by_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: &ApprovalToken,
        now: Timestamp,
    ) -> Result<ConsentRecord, ConsentsServiceError> {
        if !token.is_well_formed() {
            return Err(ConsentsServiceError::TokenNotFound);
        }

        let group = self
            .repository
            .find_token_group(tx, token)
            .await?
            .ok_or(ConsentsServiceError::TokenNotFound)?;

        self.repository.lock_group(tx, &group).await?;

        self.repository
            .lock_requested_by_token(tx, token, now)
            .await?
            .ok_or(ConsentsServiceError::TokenNotFound)
    }
}

fn transition_entries(
    event_type: AuditEventType,
    consents: &[ConsentRecord],
    via: Via,
    reason: Option<&str>,
) -> Vec<NewAuditEntry> {
    consents
        .iter()
        .map(|consent| {
            NewAuditEntry::for_consent(
                event_type,
                consent,
                details::transition(consent, via, reason),
            )
        })
        .collect()
}

#[async_trait]
impl ConsentsService for PgConsentsService {
    async fn create(&self, consent: NewConsent) -> Result<ConsentRecord, ConsentsServiceError> {
        let now = Timestamp::now();
        let data_types = consent.validate(now)?;
        let group = ConsentGroupId::new(&consent.user_id, &consent.purpose);

        let mut tx = self.db.begin_transaction().await?;

        let version = self.repository.next_version(&mut tx, &group).await?;

        let mut insert = ConsentInsert {
            uuid: ConsentUuid::new(),
            group_id: &group,
            version,
            user_id: &consent.user_id,
            purpose: &consent.purpose,
            data_types: &data_types,
            valid_until: consent.valid_until,
            status: ConsentStatus::Requested,
            approval: None,
        };

        let (created, entries) = match self.config.approval_mode {
            ApprovalMode::Manual => {
                let issued = self.config.issuer.issue(now).map_err(|_| {
                    ConsentsServiceError::InvalidInput(
                        "approval window exceeds supported range".to_string(),
                    )
                })?;

                insert.approval = Some(&issued);

                let created = self.repository.create_consent(&mut tx, insert).await?;

                let entries = vec![NewAuditEntry::for_consent(
                    AuditEventType::ConsentRequested,
                    &created,
                    details::created(&created),
                )];

                (created, entries)
            }
            ApprovalMode::Auto => {
                let active = self
                    .repository
                    .lock_group_consents(&mut tx, &group, ConsentStatus::Active)
                    .await?;

                let revoked = self
                    .transition_locked(&mut tx, active, ConsentStatus::Revoked)
                    .await?;

                insert.status = ConsentStatus::Active;

                let created = self.repository.create_consent(&mut tx, insert).await?;

                let mut entries = transition_entries(
                    AuditEventType::ConsentRevoked,
                    &revoked,
                    Via::Superseded,
                    None,
                );

                entries.push(NewAuditEntry::for_consent(
                    AuditEventType::ConsentCreated,
                    &created,
                    details::created(&created),
                ));

                (created, entries)
            }
        };

        self.record(&mut tx, entries).await?;

        tx.commit().await?;

        info!(
            consent_uuid = %created.uuid,
            consent_group_id = %created.group_id,
            version = created.version,
            status = %created.status,
            "consent created"
        );

        Ok(created)
    }

    async fn approve_by_token(
        &self,
        token: ApprovalToken,
    ) -> Result<ApprovalOutcome, ConsentsServiceError> {
        let now = Timestamp::now();
        let mut tx = self.db.begin_transaction().await?;

        let requested = self.lock_by_token(&mut tx, &token, now).await?;

        if requested.is_lapsed(now) {
            let rejected = self
                .transition_locked(&mut tx, vec![requested], ConsentStatus::Rejected)
                .await?;

            let entries = transition_entries(
                AuditEventType::ConsentRejected,
                &rejected,
                Via::Token,
                Some(VALIDITY_ELAPSED),
            );

            self.record(&mut tx, entries).await?;

            tx.commit().await?;

            let consent = rejected
                .into_iter()
                .next()
                .ok_or(ConsentsServiceError::Conflict)?;

            info!(
                consent_uuid = %consent.uuid,
                version = consent.version,
                "approval had no effect, consent validity elapsed"
            );

            return Ok(ApprovalOutcome::NoEffect(consent));
        }

        let active = self
            .repository
            .lock_group_consents(&mut tx, &requested.group_id, ConsentStatus::Active)
            .await?;

        let pending: Vec<_> = self
            .repository
            .lock_group_consents(&mut tx, &requested.group_id, ConsentStatus::Requested)
            .await?
            .into_iter()
            .filter(|consent| consent.uuid != requested.uuid)
            .collect();

        let revoked = self
            .transition_locked(&mut tx, active, ConsentStatus::Revoked)
            .await?;

        let rejected = self
            .transition_locked(&mut tx, pending, ConsentStatus::Rejected)
            .await?;

        let consent = self
            .repository
            .transition(
                &mut tx,
                requested.uuid,
                ConsentStatus::Requested,
                ConsentStatus::Active,
            )
            .await?
            .ok_or(ConsentsServiceError::Conflict)?;

        let mut entries = transition_entries(
            AuditEventType::ConsentRevoked,
            &revoked,
            Via::Superseded,
            None,
        );

        entries.extend(transition_entries(
            AuditEventType::ConsentRejected,
            &rejected,
            Via::Superseded,
            None,
        ));

        entries.push(NewAuditEntry::for_consent(
            AuditEventType::ConsentApproved,
            &consent,
            details::transition(&consent, Via::Token, None),
        ));

        self.record(&mut tx, entries).await?;

        tx.commit().await?;

        info!(
            consent_uuid = %consent.uuid,
            version = consent.version,
            superseded = revoked.len() + rejected.len(),
            "consent approved"
        );

        Ok(ApprovalOutcome::Approved {
            consent,
            revoked,
            rejected,
        })
    }

    async fn reject_by_token(
        &self,
        token: ApprovalToken,
    ) -> Result<RejectionOutcome, ConsentsServiceError> {
        let now = Timestamp::now();
        let mut tx = self.db.begin_transaction().await?;

        let requested = self.lock_by_token(&mut tx, &token, now).await?;

        let pending: Vec<_> = self
            .repository
            .lock_group_consents(&mut tx, &requested.group_id, ConsentStatus::Requested)
            .await?
            .into_iter()
            .filter(|consent| consent.uuid != requested.uuid)
            .collect();

        let superseded = self
            .transition_locked(&mut tx, pending, ConsentStatus::Rejected)
            .await?;

        let consent = self
            .repository
            .transition(
                &mut tx,
                requested.uuid,
                ConsentStatus::Requested,
                ConsentStatus::Rejected,
            )
            .await?
            .ok_or(ConsentsServiceError::Conflict)?;

        let mut entries = transition_entries(
            AuditEventType::ConsentRejected,
            &superseded,
            Via::Superseded,
            None,
        );

        entries.push(NewAuditEntry::for_consent(
            AuditEventType::ConsentRejected,
            &consent,
            details::transition(&consent, Via::Token, None),
        ));

        self.record(&mut tx, entries).await?;

        tx.commit().await?;

        info!(
            consent_uuid = %consent.uuid,
            version = consent.version,
            superseded = superseded.len(),
            "consent rejected"
        );

        Ok(RejectionOutcome {
            consent,
            superseded,
        })
    }

    async fn revoke(&self, consent: ConsentUuid) -> Result<ConsentRecord, ConsentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let revoked = self
            .repository
            .transition(
                &mut tx,
                consent,
                ConsentStatus::Active,
                ConsentStatus::Revoked,
            )
            .await?;

        let Some(revoked) = revoked else {
            let existing = self.repository.get_consent(&mut tx, consent).await?;

            return Err(match existing {
                Some(_) => ConsentsServiceError::NotActive,
                None => ConsentsServiceError::NotFound,
            });
        };

        self.record_one(
            &mut tx,
            NewAuditEntry::for_consent(
                AuditEventType::ConsentRevoked,
                &revoked,
                details::transition(&revoked, Via::Api, None),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            consent_uuid = %revoked.uuid,
            version = revoked.version,
            "consent revoked"
        );

        Ok(revoked)
    }

    async fn revoke_latest_active(
        &self,
        user_id: String,
        purpose: String,
    ) -> Result<RevocationOutcome, ConsentsServiceError> {
        validate_subject(&user_id, &purpose)?;

        let group = ConsentGroupId::new(&user_id, &purpose);
        let mut tx = self.db.begin_transaction().await?;

        if !self.repository.lock_group(&mut tx, &group).await? {
            return Ok(RevocationOutcome::NoActiveConsent);
        }

        let Some(active) = self.repository.lock_latest_active(&mut tx, &group).await? else {
            return Ok(RevocationOutcome::NoActiveConsent);
        };

        let revoked = self
            .transition_locked(&mut tx, vec![active], ConsentStatus::Revoked)
            .await?;

        let entries = transition_entries(
            AuditEventType::ConsentRevoked,
            &revoked,
            Via::Semantic,
            None,
        );

        self.record(&mut tx, entries).await?;

        tx.commit().await?;

        let revoked = revoked
            .into_iter()
            .next()
            .ok_or(ConsentsServiceError::Conflict)?;

        info!(
            consent_uuid = %revoked.uuid,
            consent_group_id = %revoked.group_id,
            version = revoked.version,
            "latest active consent revoked"
        );

        Ok(RevocationOutcome::Revoked(revoked))
    }

    async fn expire_if_due(
        &self,
        consent: ConsentUuid,
    ) -> Result<Option<ConsentRecord>, ConsentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let Some(expired) = self
            .repository
            .expire_if_due(&mut tx, consent, Timestamp::now())
            .await?
        else {
            return Ok(None);
        };

        self.record_one(
            &mut tx,
            NewAuditEntry::for_consent(
                AuditEventType::ConsentExpired,
                &expired,
                details::expired(&expired, Via::Api),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            consent_uuid = %expired.uuid,
            version = expired.version,
            "consent expired"
        );

        Ok(Some(expired))
    }

    async fn resolve(
        &self,
        user_id: String,
        purpose: String,
    ) -> Result<Option<ConsentRecord>, ConsentsServiceError> {
        validate_subject(&user_id, &purpose)?;

        let group = ConsentGroupId::new(&user_id, &purpose);
        let mut tx = self.db.begin_transaction().await?;

        let resolved = self
            .repository
            .resolve(&mut tx, &group, Timestamp::now())
            .await?;

        tx.commit().await?;

        Ok(resolved)
    }

    async fn get(&self, consent: ConsentUuid) -> Result<ConsentRecord, ConsentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let found = self.repository.get_consent(&mut tx, consent).await?;

        tx.commit().await?;

        found.ok_or(ConsentsServiceError::NotFound)
    }

    async fn history(
        &self,
        user_id: String,
        purpose: String,
    ) -> Result<Vec<ConsentRecord>, ConsentsServiceError> {
        validate_subject(&user_id, &purpose)?;

        let group = ConsentGroupId::new(&user_id, &purpose);
        let mut tx = self.db.begin_transaction().await?;

        let versions = self.repository.list_group_consents(&mut tx, &group).await?;

        tx.commit().await?;

        Ok(versions)
    }

    async fn evaluate_processing(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessingOutcome, ConsentsServiceError> {
        request.validate()?;

        let now = Timestamp::now();
        let group = ConsentGroupId::new(&request.user_id, &request.purpose);
        let mut tx = self.db.begin_transaction().await?;

        let Some(consent) = self.repository.lock_latest_active(&mut tx, &group).await? else {
            let reason = DenyReason::NoActiveConsent;

            let entry = self
                .record_one(
                    &mut tx,
                    NewAuditEntry::without_consent(
                        AuditEventType::ProcessingDenied,
                        &request.user_id,
                        details::processing(&request, None, Some(&reason)),
                    ),
                )
                .await?;

            tx.commit().await?;

            info!(
                user_id = %request.user_id,
                purpose = %request.purpose,
                reason = %reason,
                "processing denied"
            );

            return Ok(ProcessingOutcome {
                decision: PolicyDecision::Deny(reason),
                consent: None,
                audit_uuid: entry.uuid,
            });
        };

        if let Some(expired) = self
            .repository
            .expire_if_due(&mut tx, consent.uuid, now)
            .await?
        {
            let reason = DenyReason::ConsentExpired;

            let mut recorded = self
                .record(
                    &mut tx,
                    vec![
                        NewAuditEntry::for_consent(
                            AuditEventType::ConsentExpired,
                            &expired,
                            details::expired(&expired, Via::ProcessingCheck),
                        ),
                        NewAuditEntry::for_consent(
                            AuditEventType::ProcessingDenied,
                            &expired,
                            details::processing(&request, Some(&expired), Some(&reason)),
                        ),
                    ],
                )
                .await?;

            tx.commit().await?;

            let entry = recorded.pop().ok_or(ConsentsServiceError::Conflict)?;

            info!(
                consent_uuid = %expired.uuid,
                version = expired.version,
                reason = %reason,
                "processing denied"
            );

            return Ok(ProcessingOutcome {
                decision: PolicyDecision::Deny(reason),
                consent: Some(expired),
                audit_uuid: entry.uuid,
            });
        }

        let decision = policy::evaluate(&consent, &request.scope());

        let entry = match &decision {
            PolicyDecision::Allow => NewAuditEntry::for_consent(
                AuditEventType::ProcessingAllowed,
                &consent,
                details::processing(&request, Some(&consent), None),
            ),
            PolicyDecision::Deny(reason) => NewAuditEntry::for_consent(
                AuditEventType::ProcessingDenied,
                &consent,
                details::processing(&request, Some(&consent), Some(reason)),
            ),
        };

        let entry = self.record_one(&mut tx, entry).await?;

        tx.commit().await?;

        match &decision {
            PolicyDecision::Allow => info!(
                consent_uuid = %consent.uuid,
                version = consent.version,
                "processing allowed"
            ),
            PolicyDecision::Deny(reason) => info!(
                consent_uuid = %consent.uuid,
                version = consent.version,
                reason = %reason,
                "processing denied"
            ),
        }

        Ok(ProcessingOutcome {
            decision,
            consent: Some(consent),
            audit_uuid: entry.uuid,
        })
    }

    async fn sweep(&self, now: Timestamp) -> Result<SweepReport, ConsentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let expired = self.repository.sweep_expire_active(&mut tx, now).await?;
        let rejected = self.repository.sweep_reject_requested(&mut tx, now).await?;

        let mut entries: Vec<_> = expired
            .iter()
            .map(|consent| {
                NewAuditEntry::for_consent(
                    AuditEventType::ConsentExpired,
                    consent,
                    details::expired(consent, Via::ScheduledJob),
                )
            })
            .collect();

        entries.extend(rejected.iter().map(|consent| {
            let reason = if consent.is_lapsed(now) {
                VALIDITY_ELAPSED
            } else {
                APPROVAL_EXPIRED
            };

            NewAuditEntry::for_consent(
                AuditEventType::ConsentRejected,
                consent,
                details::transition(consent, Via::ScheduledJob, Some(reason)),
            )
        }));

        self.record(&mut tx, entries).await?;

        tx.commit().await?;

        let report = SweepReport {
            expired: expired.len(),
            rejected: rejected.len(),
        };

        if report.total() > 0 {
            info!(
                expired = report.expired,
                rejected = report.rejected,
                "consent sweep transitioned consents"
            );
        } else {
            debug!("consent sweep found nothing due");
        }

        Ok(report)
    }
}

#[automock]
#[async_trait]
pub trait ConsentsService: Send + Sync {
    /// Create the next consent version for a `(user, purpose)` pair.
    async fn create(&self, consent: NewConsent) -> Result<ConsentRecord, ConsentsServiceError>;

    /// Activate the pending consent carrying `token`, superseding the rest of its group.
    async fn approve_by_token(
        &self,
        token: ApprovalToken,
    ) -> Result<ApprovalOutcome, ConsentsServiceError>;

    /// Reject the pending consent carrying `token` and every other pending request in its group.
    async fn reject_by_token(
        &self,
        token: ApprovalToken,
    ) -> Result<RejectionOutcome, ConsentsServiceError>;

    /// Revoke one `ACTIVE` consent version.
    async fn revoke(&self, consent: ConsentUuid) -> Result<ConsentRecord, ConsentsServiceError>;

    /// Revoke the group's current `ACTIVE` consent, if there is one.
    async fn revoke_latest_active(
        &self,
        user_id: String,
        purpose: String,
    ) -> Result<RevocationOutcome, ConsentsServiceError>;

    /// Expire an `ACTIVE` consent whose validity has elapsed.
    async fn expire_if_due(
        &self,
        consent: ConsentUuid,
    ) -> Result<Option<ConsentRecord>, ConsentsServiceError>;

    /// The authoritative consent for a `(user, purpose)` pair, if any.
    async fn resolve(
        &self,
        user_id: String,
        purpose: String,
    ) -> Result<Option<ConsentRecord>, ConsentsServiceError>;

    /// Any consent version by id.
    async fn get(&self, consent: ConsentUuid) -> Result<ConsentRecord, ConsentsServiceError>;

    /// Every version of a `(user, purpose)` pair, oldest first.
    async fn history(
        &self,
        user_id: String,
        purpose: String,
    ) -> Result<Vec<ConsentRecord>, ConsentsServiceError>;

    /// Decide whether processing may proceed and record the decision.
    async fn evaluate_processing(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessingOutcome, ConsentsServiceError>;

    /// Expire lapsed consents and reject stale requests as of `now`.
    async fn sweep(&self, now: Timestamp) -> Result<SweepReport, ConsentsServiceError>;
}
