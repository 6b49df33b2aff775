//! Server configuration module

use clap::Parser;

use crate::config::{
    admin::AdminConfig,
    consents::ConsentsSettings,
    db::DatabaseConfig,
    observability::{LoggingConfig, ObservabilityConfig},
    server::ServerRuntimeConfig,
    sweep::SweepConfig,
};

pub(crate) mod admin;
pub(crate) mod consents;
pub(crate) mod db;
pub(crate) mod observability;
pub(crate) mod server;
pub(crate) mod sweep;

/// Consent Ledger JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "consent-json", about = "Consent Ledger JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Request logging settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Consent lifecycle settings.
    #[command(flatten)]
    pub consents: ConsentsSettings,

    /// Background sweep settings.
    #[command(flatten)]
    pub sweep: SweepConfig,

    /// Admin route settings.
    #[command(flatten)]
    pub admin: AdminConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }
}
