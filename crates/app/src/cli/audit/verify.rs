use clap::Args;
use consent_app::domain::audit::{AuditService, PgAuditService};

use crate::cli::ConnectionArgs;

#[derive(Debug, Args)]
pub(crate) struct VerifyAuditArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
}

pub(crate) async fn run(args: VerifyAuditArgs) -> Result<(), String> {
    let db = args.connection.connect().await?;

    let verification = PgAuditService::new(db)
        .verify()
        .await
        .map_err(|error| format!("failed to verify audit chain: {error}"))?;

    match verification.first_break {
        None => {
            println!("audit chain intact: {} entries", verification.entries);

            Ok(())
        }
        Some(chain_break) => Err(format!(
            "audit chain broken at entry {} of {} (audit_uuid: {}, {})",
            chain_break.index,
            verification.entries,
            chain_break.audit_uuid,
            chain_break.kind.as_str()
        )),
    }
}
