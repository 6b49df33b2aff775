use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use consent_app::database::{self, Db};

mod audit;
mod consent;
mod db;
mod sweep;

#[derive(Debug, Parser)]
#[command(name = "consent-app", about = "Consent ledger CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Audit(audit::AuditCommand),
    Consent(consent::ConsentCommand),
    Db(db::DbCommand),
    Sweep(sweep::SweepArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Audit(command) => audit::run(command).await,
            Commands::Consent(command) => consent::run(command).await,
            Commands::Db(command) => db::run(command).await,
            Commands::Sweep(args) => sweep::run(args).await,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct ConnectionArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// How long a transaction may wait on row locks, in milliseconds
    #[arg(long, env = "DB_LOCK_TIMEOUT_MS", default_value_t = 5_000)]
    lock_timeout_ms: u64,
}

impl ConnectionArgs {
    pub(crate) async fn connect(&self) -> Result<Db, String> {
        let pool = database::connect(&self.database_url)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        Ok(Db::new(pool).with_lock_timeout(Duration::from_millis(self.lock_timeout_ms)))
    }
}
