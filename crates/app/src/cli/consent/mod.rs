use clap::{Args, Subcommand};

mod list;

#[derive(Debug, Args)]
pub(crate) struct ConsentCommand {
    #[command(subcommand)]
    command: ConsentSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConsentSubcommand {
    List(list::ListConsentsArgs),
}

pub(crate) async fn run(command: ConsentCommand) -> Result<(), String> {
    match command.command {
        ConsentSubcommand::List(args) => list::run(args).await,
    }
}
