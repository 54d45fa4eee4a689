use crate::commands::{
    run_name_lookup, run_postal_lookup, run_stats, NameLookupArgs, PostalLookupArgs, StatsArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use riding_lookup::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Riding Lookup",
    about = "Find elected representatives by postal code or name and inspect their voting statistics",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Resolve a representative once and print the result as JSON
    Lookup {
        #[command(subcommand)]
        command: LookupCommand,
    },
    /// Print voting statistics for a representative as JSON
    Stats(StatsArgs),
}

#[derive(Subcommand, Debug)]
enum LookupCommand {
    /// Resolve by postal code
    Postal(PostalLookupArgs),
    /// Resolve by representative name
    Name(NameLookupArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Lookup {
            command: LookupCommand::Postal(args),
        } => run_postal_lookup(args).await,
        Command::Lookup {
            command: LookupCommand::Name(args),
        } => run_name_lookup(args).await,
        Command::Stats(args) => run_stats(args).await,
    }
}
