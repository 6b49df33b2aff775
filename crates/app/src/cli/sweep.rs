use clap::Args;
use consent_app::domain::consents::{ConsentsConfig, ConsentsService, PgConsentsService};
use jiff::Timestamp;

use crate::cli::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct SweepArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
}

pub(crate) async fn run(args: SweepArgs) -> Result<(), String> {
    let db = args.connection.connect().await?;

    let report = PgConsentsService::new(db, ConsentsConfig::default())
        .sweep(Timestamp::now())
        .await
        .map_err(|error| format!("failed to sweep consents: {error}"))?;

    println!("expired: {}", report.expired);
    println!("rejected: {}", report.rejected);

    Ok(())
}
