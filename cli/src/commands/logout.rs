//! `dock logout`

use std::process::ExitCode;

use colored::Colorize;

use crate::errors::CliError;
use crate::storage::credentials::clear_credentials;

pub async fn run() -> Result<ExitCode, CliError> {
    let user = clear_credentials().await?;

    match user.and_then(|u| u.username) {
        Some(name) => println!(
            "{}",
            format!("Logged out {} successfully!", name).green()
        ),
        None => println!("{}", "Logged out successfully!".green()),
    }

    Ok(ExitCode::SUCCESS)
}
