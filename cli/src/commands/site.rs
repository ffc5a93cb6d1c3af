//! `dock site` — project listing, one-shot exec and the interactive shell.

use std::process::ExitCode;

use colored::Colorize;
use dialoguer::{Input, Select};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::http::projects::Project;
use crate::storage::credentials::require_token;
use crate::storage::settings::ApiSettings;

/// `dock site list`
pub async fn list(settings: &ApiSettings) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let projects = match api.list_projects(&creds.token).await {
        Ok(projects) => projects,
        Err(e) if e.api_status() == Some(401) => {
            println!("{}", "Session expired. Run `dock login` again.".red());
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e),
    };

    if projects.is_empty() {
        println!("{}", "No projects found.".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "\n  Your Projects\n".bold());
    println!("{}", format!("  {}", "─".repeat(70)).dimmed());
    for p in &projects {
        let status = if p.status == "running" {
            p.status.green()
        } else {
            p.status.red()
        };
        let sep = "|".dimmed();
        println!(
            "  {}  {}  {}  {}  {}  {}  {}",
            p.name.bold(),
            sep,
            p.project_type.cyan(),
            sep,
            status,
            sep,
            p.domain().blue(),
        );
    }
    println!("{}", format!("  {}", "─".repeat(70)).dimmed());
    println!(
        "{}",
        format!("\n  {} project(s) total\n", projects.len()).dimmed()
    );

    Ok(ExitCode::SUCCESS)
}

/// `dock site exec [name] [command]`
pub async fn exec(
    settings: &ApiSettings,
    name: Option<String>,
    command: Option<String>,
) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let Some(project) = select_project(&api, &creds.token, name).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    let command = match command {
        Some(command) => command,
        None => Input::new()
            .with_prompt("Enter command to execute")
            .validate_with(|input: &String| {
                if input.trim().is_empty() {
                    Err("Command cannot be empty.")
                } else {
                    Ok(())
                }
            })
            .interact_text()?,
    };

    run_in_project(&api, &creds.token, &project.id, &command).await;
    Ok(ExitCode::SUCCESS)
}

/// `dock site shell [name]` — line-oriented remote shell.
pub async fn shell(settings: &ApiSettings, name: Option<String>) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let Some(project) = select_project(&api, &creds.token, name).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    println!(
        "{}",
        format!(
            "\n  Connected to {} ({})",
            project.name.cyan(),
            project.project_type
        )
        .bold()
    );
    if let Some(subdomain) = &project.subdomain {
        println!("{}", format!("  URL: {}", subdomain).dimmed());
    }
    println!(
        "{}",
        "  Type your commands below. Use \"exit\" or Ctrl+C to quit.\n".dimmed()
    );

    let prompt = shell_prompt(&project);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", prompt);
        use std::io::Write;
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("{}", "  Disconnected.".dimmed());
                break;
            }
            "help" | "?" => {
                print_shell_help();
                continue;
            }
            "clear" => {
                print!("\x1B[2J\x1B[H");
                continue;
            }
            _ => {}
        }

        run_in_project(&api, &creds.token, &project.id, input).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Resolve a project by name/id, or prompt interactively.
async fn select_project(
    api: &HttpClient,
    token: &str,
    name: Option<String>,
) -> Result<Option<Project>, CliError> {
    let projects = api.list_projects(token).await?;
    if projects.is_empty() {
        println!(
            "{}",
            "No projects found. Create one from the dashboard first.".yellow()
        );
        return Ok(None);
    }

    if let Some(name) = name {
        let matched = projects.iter().find(|p| {
            p.name == name || p.id == name || p.name.to_lowercase() == name.to_lowercase()
        });
        return match matched {
            Some(project) => Ok(Some(project.clone())),
            None => {
                println!("{}", format!("Project \"{}\" not found.", name).red());
                let available: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
                println!(
                    "{}",
                    format!("Available: {}", available.join(", ")).dimmed()
                );
                Ok(None)
            }
        };
    }

    let labels: Vec<String> = projects
        .iter()
        .map(|p| {
            format!(
                "{} ({}) - {}",
                p.name,
                p.project_type,
                if p.status == "running" {
                    p.status.green()
                } else {
                    p.status.red()
                }
            )
        })
        .collect();
    let index = Select::new()
        .with_prompt("Select a project")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Some(projects[index].clone()))
}

/// Execute one command remotely and print its output.
async fn run_in_project(api: &HttpClient, token: &str, project_id: &str, command: &str) {
    match api.exec_in_project(token, project_id, command).await {
        Ok(result) => {
            if !result.output.is_empty() {
                print!("{}", result.output);
                if !result.output.ends_with('\n') {
                    println!();
                }
            }
            if result.exit_code != 0 {
                println!(
                    "{}",
                    format!("  Exit code: {}", result.exit_code).yellow()
                );
            }
        }
        Err(e) => {
            println!("{}", format!("  Error: {}", e).red());
        }
    }
}

fn shell_prompt(project: &Project) -> String {
    let name = &project.name;
    match project.project_type.as_str() {
        "laravel" => format!("{}:laravel$ ", name).magenta().to_string(),
        "php" => format!("{}:php$ ", name).magenta().to_string(),
        "node" | "nodejs" => format!("{}:node$ ", name).green().to_string(),
        "python" => format!("{}:python$ ", name).yellow().to_string(),
        "go" => format!("{}:go$ ", name).cyan().to_string(),
        "html" | "static" => format!("{}:static$ ", name).white().to_string(),
        "spring-boot" | "java" => format!("{}:java$ ", name).red().to_string(),
        _ => format!("{}$ ", name).white().to_string(),
    }
}

fn print_shell_help() {
    println!("{}", "\n  Dock Site Shell Commands:\n".bold());
    println!("  exit, quit         Exit the shell");
    println!("  help, ?            Show this help");
    println!("  clear              Clear the screen");
    println!();
    println!("{}", "  Common commands:".dimmed());
    println!("{}", "    ls -la             List files".dimmed());
    println!("{}", "    cat <file>         View file contents".dimmed());
    println!("{}", "    env                Show environment variables".dimmed());
    println!();
}
