//! App Context

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    database::{self, Db},
    domain::{
        audit::{AuditService, PgAuditService},
        consents::{ConsentsConfig, ConsentsService, PgConsentsService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply database migrations")]
    Migrations(#[source] sqlx::migrate::MigrateError),
}

/// Storage settings shared by every service.
#[derive(Debug, Clone, Copy)]
pub struct StorageSettings {
    pub lock_timeout: Duration,
    pub run_migrations: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            lock_timeout: database::DEFAULT_LOCK_TIMEOUT,
            run_migrations: true,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub consents: Arc<dyn ConsentsService>,
    pub audit: Arc<dyn AuditService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting or migrating the database fails.
    pub async fn from_database_url(
        url: &str,
        storage: StorageSettings,
        consents: ConsentsConfig,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        if storage.run_migrations {
            database::migrate(&pool)
                .await
                .map_err(AppInitError::Migrations)?;
        }

        let db = Db::new(pool).with_lock_timeout(storage.lock_timeout);

        Ok(Self::from_db(db, consents))
    }

    #[must_use]
    pub fn from_db(db: Db, consents: ConsentsConfig) -> Self {
        Self {
            consents: Arc::new(PgConsentsService::new(db.clone(), consents)),
            audit: Arc::new(PgAuditService::new(db)),
        }
    }
}
