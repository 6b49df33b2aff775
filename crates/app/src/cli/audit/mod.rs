use clap::{Args, Subcommand};

mod list;
mod verify;

#[derive(Debug, Args)]
pub(crate) struct AuditCommand {
    #[command(subcommand)]
    command: AuditSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuditSubcommand {
    List(list::ListAuditArgs),
    Verify(verify::VerifyAuditArgs),
}

pub(crate) async fn run(command: AuditCommand) -> Result<(), String> {
    match command.command {
        AuditSubcommand::List(args) => list::run(args).await,
        AuditSubcommand::Verify(args) => verify::run(args).await,
    }
}
