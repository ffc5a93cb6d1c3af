//! Dock CLI - Entry Point
//!
//! A command-line client for the Dock application-hosting platform:
//! authenticate, package and deploy a project directory, and watch the
//! remote build log as it happens.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use dock_cli::commands;
use dock_cli::errors::CliError;
use dock_cli::logs::{init_logging, LogLevel};
use dock_cli::storage::settings::ApiSettings;

#[derive(Parser)]
#[command(name = "dock", version, about = "Deploy projects to the Dock platform")]
struct Cli {
    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in via the web dashboard
    Login,

    /// Remove stored credentials
    Logout,

    /// Package the current directory and deploy it
    Deploy,

    /// Download a project's files into a new directory
    Clone {
        /// Project name (interactive selection when omitted)
        name: Option<String>,
    },

    /// Manage hosted projects
    #[command(subcommand)]
    Site(SiteCommand),

    /// Manage database services
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand)]
enum SiteCommand {
    /// List your projects
    List,

    /// Run a command inside a project container
    Exec {
        name: Option<String>,
        command: Option<String>,
    },

    /// Interactive remote shell for a project
    Shell { name: Option<String> },
}

#[derive(Subcommand)]
enum DbCommand {
    /// List your database services
    List,

    /// Show connection details for a service
    Info { name: Option<String> },

    /// Run a single query against a service
    Exec {
        name: Option<String>,
        query: Option<String>,
    },

    /// Interactive query console
    Connect { name: Option<String> },

    /// Run a shell command inside the service container
    Shell {
        name: Option<String>,
        command: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let settings = ApiSettings::from_env();

    match run_command(cli.command, &settings).await {
        Ok(code) => code,
        Err(e) => {
            println!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

async fn run_command(command: Command, settings: &ApiSettings) -> Result<ExitCode, CliError> {
    match command {
        Command::Login => commands::login::run(settings).await,
        Command::Logout => commands::logout::run().await,
        Command::Deploy => commands::deploy::run(settings).await,
        Command::Clone { name } => commands::clone::run(settings, name).await,
        Command::Site(site) => match site {
            SiteCommand::List => commands::site::list(settings).await,
            SiteCommand::Exec { name, command } => {
                commands::site::exec(settings, name, command).await
            }
            SiteCommand::Shell { name } => commands::site::shell(settings, name).await,
        },
        Command::Db(db) => match db {
            DbCommand::List => commands::db::list(settings).await,
            DbCommand::Info { name } => commands::db::info(settings, name).await,
            DbCommand::Exec { name, query } => commands::db::exec(settings, name, query).await,
            DbCommand::Connect { name } => commands::db::connect(settings, name).await,
            DbCommand::Shell { name, command } => {
                commands::db::shell(settings, name, command).await
            }
        },
    }
}
