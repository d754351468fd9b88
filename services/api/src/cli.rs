use crate::commands::{
    run_autofill, run_catalogue_validate, run_evaluate, AutofillArgs, CatalogueValidateArgs,
    EvaluateArgs,
};
use crate::server;
use benefit_engine::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Benefit Engine",
    about = "Check benefit eligibility and prefill applications from the command line",
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
    /// Rank catalogue programs for a profile
    Evaluate(EvaluateArgs),
    /// Prefill one program's application form from a profile
    Autofill(AutofillArgs),
    /// Inspect program catalogues
    Catalogue {
        #[command(subcommand)]
        command: CatalogueCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogueCommand {
    /// Load a catalogue file and report configuration errors
    Validate(CatalogueValidateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve this catalogue instead of the configured one
    #[arg(long)]
    pub(crate) catalogue: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Autofill(args) => run_autofill(args),
        Command::Catalogue {
            command: CatalogueCommand::Validate(args),
        } => run_catalogue_validate(args),
    }
}
