//! Database Config

use std::time::Duration;

use clap::Args;

/// Database settings.
#[derive(Debug, Args)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// How long a transaction may wait on row locks, in milliseconds
    #[arg(long, env = "DB_LOCK_TIMEOUT_MS", default_value_t = 5_000_u64)]
    pub lock_timeout_ms: u64,
}

impl DatabaseConfig {
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
