//! `dock deploy`

use std::process::ExitCode;

use colored::Colorize;

use crate::deploy::pipeline;
use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::storage::credentials::require_token;
use crate::storage::settings::ApiSettings;

/// Package the current directory, trigger a deployment and stream the
/// remote build log.
pub async fn run(settings: &ApiSettings) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;
    let root = std::env::current_dir()?;

    // An interrupt drops the pipeline future; the archive guard inside it
    // removes the partial state on the way out.
    let result = tokio::select! {
        result = pipeline::run(&api, settings, &creds.token, &root) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "Interrupted.".yellow());
            return Ok(ExitCode::from(130));
        }
    };

    Ok(match result {
        Some(outcome) => ExitCode::from(outcome.exit_code()),
        // User cancelled during resolution; nothing happened.
        None => ExitCode::SUCCESS,
    })
}
