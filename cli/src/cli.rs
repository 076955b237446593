//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::domain::error::{ConfigError, SiteError};

/// Provision WordPress on a fresh Ubuntu server over SSH
#[derive(Parser)]
#[command(
    name = "siteforge",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Assume yes for confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check SSH access and report host facts
    Probe(commands::probe::ProbeArgs),

    /// Install Nginx, MySQL, PHP and WordPress
    Install(Box<commands::install::InstallArgs>),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// In JSON mode, argument and configuration errors are printed to stdout
    /// as a JSON error object and turned into a failing exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails in human mode.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        });

        let result = match command {
            Command::Probe(args) => commands::probe::run(&app, &args).await,
            Command::Install(args) => commands::install::run(&app, &args).await,
            Command::Config(cmd) => commands::config::run(&app, &cmd),
            Command::Version => {
                commands::version::run(&app);
                Ok(ExitCode::SUCCESS)
            }
        };

        match result {
            Err(err) if app.is_json() => {
                println!(
                    "{}",
                    crate::output::json::format_error(&format!("{err:#}"), error_code(&err))?
                );
                Ok(ExitCode::FAILURE)
            }
            other => other,
        }
    }
}

fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<SiteError>().is_some() {
        "INVALID_INPUT"
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "INVALID_CONFIG"
    } else {
        "COMMAND_FAILED"
    }
}
