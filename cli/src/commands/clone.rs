//! `dock clone` — download a project's files into a new local directory
//! and link it for future deploys.

use std::process::ExitCode;

use colored::Colorize;
use dialoguer::{Confirm, Select};

use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::http::projects::Project;
use crate::storage::credentials::require_token;
use crate::storage::link;
use crate::storage::settings::ApiSettings;

pub async fn run(settings: &ApiSettings, name: Option<String>) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let projects = api.list_projects(&creds.token).await?;
    if projects.is_empty() {
        println!("{}", "No projects found.".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(project) = select_project(&projects, name)? else {
        return Ok(ExitCode::SUCCESS);
    };

    println!("{}", format!("Cloning {}...", project.name).blue());

    let target_dir = std::env::current_dir()?.join(&project.name);
    if target_dir.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!(
                "Directory \"{}\" already exists. Overwrite?",
                project.name
            ))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("{}", "Operation cancelled.".yellow());
            return Ok(ExitCode::SUCCESS);
        }
        tokio::fs::remove_dir_all(&target_dir).await?;
    }
    tokio::fs::create_dir_all(&target_dir).await?;

    println!("{}", "Downloading project files...".dimmed());
    let bytes = match api.download_project(&creds.token, &project.id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            println!("{}", "Failed to download project.".red());
            println!("{}", format!("Error: {}", e).red());
            // Do not leave a half-created directory behind.
            let _ = tokio::fs::remove_dir_all(&target_dir).await;
            return Ok(ExitCode::FAILURE);
        }
    };

    extract_archive(bytes, target_dir.clone()).await?;
    println!("{}", "Files extracted!".green());

    link::write_link(&target_dir, &project.id).await?;

    println!();
    println!(
        "{}",
        format!("✓ Project \"{}\" cloned successfully!", project.name).green()
    );
    println!("{}", format!("  cd {}", project.name).dimmed());
    println!("{}", "  dock deploy".dimmed());

    Ok(ExitCode::SUCCESS)
}

fn select_project(
    projects: &[Project],
    name: Option<String>,
) -> Result<Option<Project>, CliError> {
    if let Some(name) = name {
        return match projects.iter().find(|p| p.name == name) {
            Some(project) => Ok(Some(project.clone())),
            None => {
                println!("{}", format!("Project \"{}\" not found.", name).red());
                Ok(None)
            }
        };
    }

    let labels: Vec<String> = projects.iter().map(|p| p.label()).collect();
    let index = Select::new()
        .with_prompt("Select project to clone")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Some(projects[index].clone()))
}

/// Unpack the downloaded zip into the target directory on a blocking task.
async fn extract_archive(bytes: Vec<u8>, target_dir: std::path::PathBuf) -> Result<(), CliError> {
    tokio::task::spawn_blocking(move || {
        let reader = std::io::Cursor::new(bytes);
        let mut zip = zip::ZipArchive::new(reader)?;
        zip.extract(&target_dir)?;
        Ok::<(), CliError>(())
    })
    .await
    .map_err(|e| CliError::Internal(format!("extraction task panicked: {e}")))?
}
