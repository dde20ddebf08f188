mod commands;
mod progress;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drupal_aws")]
#[command(about = "Launch a Puppet-managed Drupal stack on AWS", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates a new Drupal stack
    Create {
        /// Notification email address
        #[arg(short = 'e', long = "email")]
        email: Option<String>,
    },
    /// Checks on the health of an existing stack
    Status {
        /// Enable verbose logging
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Tears down an existing stack
    Destroy {
        /// Delete the stack without prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // 標準出力はオペレーター向けの表示に使うので、ログは stderr に出す
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    init_tracing(matches!(command, Commands::Status { verbose: true }));

    match run(command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    let config = drupal_launcher_config::load()?;
    tracing::debug!("Using region {}", config.region);
    let provider = drupal_launcher_cloud_aws::AwsProvider::new(config.region.clone()).await;

    match command {
        Commands::Create { email } => {
            commands::create::handle(&config, &provider, email).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { .. } => {
            let up = commands::status::handle(&config, &provider).await?;
            Ok(if up {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Destroy { yes } => {
            commands::destroy::handle(&config, &provider, yes).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
