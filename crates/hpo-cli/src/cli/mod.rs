mod commands;

use clap::Parser;
use hpo_core::domain::HpoError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let hpo_error = error.as_hpo_error();
            eprintln!("{}", hpo_error.diagnostic_line());
            if let Some(summary_line) = hpo_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            hpo_error.exit_code()
        }
    }
}

/// Logs go to stderr so that stdout carries only JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("hpo".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "hpo",
    version,
    about = "Spectral sweep of a harmonic-potential operator matched against zeta zeros"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Build the operator, sweep its spectrum and match it to the reference
    Run(commands::RunArgs),
    /// Print the built-in reference ordinates as JSON
    Reference(commands::ReferenceArgs),
    /// List the named parameter presets as JSON
    Presets,
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_spectral_command(args),
        CliCommand::Reference(args) => commands::run_reference_command(args),
        CliCommand::Presets => commands::run_presets_command(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(HpoError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_hpo_error(&self) -> HpoError {
        match self {
            Self::Usage(message) => HpoError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => HpoError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
