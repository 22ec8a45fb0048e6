use clap::{Parser, Subcommand};
use tapsign_apdu_transport_pcsc::PcscConnector;

mod commands;
mod utils;

use commands::{SignArgs, list_command, sign_command};

#[derive(Parser)]
#[command(version, about = "Sign messages with a contactless signing card")]
struct Cli {
    /// Trace level output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Sign a message with the card on a reader
    Sign(SignArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::setup_logging(cli.verbose);

    let connector = PcscConnector::new()?;

    match cli.command {
        Commands::List => list_command(&connector),
        Commands::Sign(args) => sign_command(connector, args),
    }
}
