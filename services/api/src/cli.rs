use crate::demo::{run_demo, run_moderation_report, DemoArgs, ModerateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use student_housing::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Student Housing Listings",
    about = "Run and inspect the student housing listings service from the command line",
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
    /// Print the moderation report for a listing draft stored as JSON
    Moderate(ModerateArgs),
    /// Run an end-to-end demo against seeded in-memory locations
    Demo(DemoArgs),
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
        Command::Moderate(args) => run_moderation_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
