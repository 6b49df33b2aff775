use clap::Args;
use consent_app::domain::{
    audit::{AuditService, PgAuditService},
    consents::records::ConsentUuid,
};
use uuid::Uuid;

use crate::cli::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct ListAuditArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Only show entries recorded against this consent version
    #[arg(long)]
    consent_uuid: Option<Uuid>,
}

pub(crate) async fn run(args: ListAuditArgs) -> Result<(), String> {
    let service = PgAuditService::new(args.connection.connect().await?);

    let entries = match args.consent_uuid {
        Some(consent) => {
            service
                .list_consent_entries(ConsentUuid::from_uuid(consent))
                .await
        }
        None => service.list_entries().await,
    }
    .map_err(|error| format!("failed to list audit entries: {error}"))?;

    if entries.is_empty() {
        println!("no audit entries found");
        return Ok(());
    }

    for entry in entries {
        println!("audit_uuid: {}", entry.uuid);
        println!("event_type: {}", entry.event_type);
        println!(
            "consent_uuid: {}",
            entry
                .consent_uuid
                .map_or_else(|| "none".to_string(), |value| value.to_string())
        );
        println!("user_id: {}", entry.user_id);
        println!("timestamp: {}", entry.timestamp);
        println!("details: {}", entry.details);
        println!("hash: {}", entry.hash);
        println!();
    }

    Ok(())
}
