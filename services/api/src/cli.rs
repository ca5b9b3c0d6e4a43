use crate::assess::{print_rubric, run_assessment, AssessArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use disaster_triage::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Disaster Triage",
    about = "Score disaster evidence against the severity rubric and serve the triage API",
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
    /// Assess a saved collaborator response and print the severity breakdown
    Assess(AssessArgs),
    /// Print the scoring rubric with indicator weights
    Rubric,
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
        Command::Assess(args) => run_assessment(args),
        Command::Rubric => {
            print_rubric();
            Ok(())
        }
    }
}
