use clap::Args;
use consent_app::domain::consents::{ConsentsConfig, ConsentsService, PgConsentsService};

use crate::cli::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct ListConsentsArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// User whose consent versions should be listed
    #[arg(long)]
    user_id: String,

    /// Processing purpose the consents were given for
    #[arg(long)]
    purpose: String,
}

pub(crate) async fn run(args: ListConsentsArgs) -> Result<(), String> {
    let db = args.connection.connect().await?;

    let versions = PgConsentsService::new(db, ConsentsConfig::default())
        .history(args.user_id.clone(), args.purpose.clone())
        .await
        .map_err(|error| format!("failed to list consents: {error}"))?;

    if versions.is_empty() {
        println!("no consents found for {}:{}", args.user_id, args.purpose);
        return Ok(());
    }

    for consent in versions {
        println!("consent_uuid: {}", consent.uuid);
        println!("version: {}", consent.version);
        println!("status: {}", consent.status);
        println!(
            "data_types: {}",
            consent.data_types.into_iter().collect::<Vec<_>>().join(",")
        );
        println!("valid_until: {}", consent.valid_until);
        println!("created_at: {}", consent.created_at);
        println!("updated_at: {}", consent.updated_at);
        println!();
    }

    Ok(())
}
