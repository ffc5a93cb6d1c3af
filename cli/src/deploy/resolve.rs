//! Project resolution
//!
//! Determines which remote project a deploy targets: the persisted link
//! file wins; otherwise the user links to an existing project or creates a
//! new one, and the choice is written back to `.dock/dock.json`.

use std::path::Path;

use colored::Colorize;
use dialoguer::{Input, Select};

use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::http::projects::NewProject;
use crate::storage::link;

/// Selectable project types, display label first.
const PROJECT_TYPES: &[(&str, &str)] = &[
    ("Node.js", "node"),
    ("Python (Flask)", "python"),
    ("PHP (Generic)", "php"),
    ("PHP (Laravel)", "laravel"),
    ("Go", "go"),
    ("Java (Spring Boot)", "spring-boot"),
    ("Docker (Dockerfile/Compose)", "docker"),
    ("Static HTML", "html"),
];

/// Resolve the target project id for a deploy from `root`.
///
/// `Ok(None)` means the user cancelled; that is not an error and produces
/// no outcome.
pub async fn resolve_project(
    api: &HttpClient,
    token: &str,
    root: &Path,
) -> Result<Option<String>, CliError> {
    if let Some(project_id) = link::read_link(root).await {
        println!(
            "{}",
            format!("Found existing project link: {}", project_id).dimmed()
        );
        return Ok(Some(project_id));
    }

    println!("{}", "No existing project link found.".cyan());

    let action = Select::new()
        .with_prompt("What would you like to do?")
        .items(&["Link to existing project", "Create new project"])
        .default(0)
        .interact()?;

    let project_id = match action {
        0 => link_existing(api, token).await?,
        _ => create_new(api, token, root).await?,
    };

    if let Some(id) = &project_id {
        link::write_link(root, id).await?;
        println!(
            "{}",
            format!("Linked to project {} (saved to .dock/dock.json)", id).green()
        );
    }

    Ok(project_id)
}

async fn link_existing(api: &HttpClient, token: &str) -> Result<Option<String>, CliError> {
    let projects = api.list_projects(token).await?;
    if projects.is_empty() {
        println!("{}", "No projects found. Please create one first.".yellow());
        return Ok(None);
    }

    let labels: Vec<String> = projects.iter().map(|p| p.label()).collect();
    let index = Select::new()
        .with_prompt("Select project to deploy to")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(Some(projects[index].id.clone()))
}

async fn create_new(
    api: &HttpClient,
    token: &str,
    root: &Path,
) -> Result<Option<String>, CliError> {
    let default_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let detected = detect_project_type(root);

    let name: String = Input::new()
        .with_prompt("Project Name")
        .default(default_name)
        .validate_with(|input: &String| {
            if !input.is_empty()
                && input
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                Ok(())
            } else {
                Err("Name can only contain letters, numbers, dashes and underscores.")
            }
        })
        .interact_text()?;

    let labels: Vec<&str> = PROJECT_TYPES.iter().map(|(label, _)| *label).collect();
    let default_index = PROJECT_TYPES
        .iter()
        .position(|(_, value)| *value == detected)
        .unwrap_or(0);
    let type_index = Select::new()
        .with_prompt("Project Type")
        .items(&labels)
        .default(default_index)
        .interact()?;

    let project = api
        .create_project(
            token,
            &NewProject {
                name: name.clone(),
                project_type: PROJECT_TYPES[type_index].1.to_string(),
                skip_deploy: true,
            },
        )
        .await?;

    println!("{}", format!("Project {} created!", name).green());
    Ok(Some(project.id))
}

/// Guess the project type from marker files at the project root.
pub fn detect_project_type(root: &Path) -> &'static str {
    let exists = |name: &str| root.join(name).exists();

    if exists("docker-compose.yml") || exists("docker-compose.yaml") || exists("Dockerfile") {
        "docker"
    } else if exists("artisan") {
        "laravel"
    } else if exists("pom.xml") {
        "spring-boot"
    } else if exists("requirements.txt") {
        "python"
    } else if exists("composer.json") || exists("index.php") {
        "php"
    } else if exists("go.mod") {
        "go"
    } else {
        "node"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_defaults_to_node() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_project_type(dir.path()), "node");
    }

    #[test]
    fn test_detect_docker_wins_over_language_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch").unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(detect_project_type(dir.path()), "docker");
    }

    #[test]
    fn test_detect_laravel() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("artisan"), "").unwrap();
        std::fs::write(dir.path().join("composer.json"), "{}").unwrap();
        assert_eq!(detect_project_type(dir.path()), "laravel");
    }

    #[test]
    fn test_detect_go() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(detect_project_type(dir.path()), "go");
    }
}
