//! `dock db` — database service listing, details, queries and the
//! interactive query REPL.

use std::process::ExitCode;

use colored::Colorize;
use dialoguer::{Input, Select};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::http::services::Service;
use crate::storage::credentials::require_token;
use crate::storage::settings::ApiSettings;

/// `dock db list`
pub async fn list(settings: &ApiSettings) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let services = match api.list_services(&creds.token).await {
        Ok(services) => services,
        Err(e) if e.api_status() == Some(401) => {
            println!("{}", "Session expired. Run `dock login` again.".red());
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e),
    };

    if services.is_empty() {
        println!("{}", "No database services found.".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "\n  Your Database Services\n".bold());
    println!("{}", format!("  {}", "─".repeat(70)).dimmed());
    for s in &services {
        let status = if s.status == "running" {
            s.status.green()
        } else {
            s.status.red()
        };
        let sep = "|".dimmed();
        println!(
            "  {}  {}  {}  {}  {}  {}  ID: {}",
            s.name.bold(),
            sep,
            s.service_type.cyan(),
            sep,
            status,
            sep,
            s.id.dimmed(),
        );
    }
    println!("{}", format!("  {}", "─".repeat(70)).dimmed());
    println!(
        "{}",
        format!("\n  {} service(s) total\n", services.len()).dimmed()
    );

    Ok(ExitCode::SUCCESS)
}

/// `dock db info [name]`
pub async fn info(settings: &ApiSettings, name: Option<String>) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let Some(service) = select_service(&api, &creds.token, name).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    // The list endpoint omits credentials; fetch full details.
    let detail = api.service_detail(&creds.token, &service.id).await?;

    let na = || "N/A".to_string();
    println!("{}", format!("\n  Database: {}\n", detail.name).bold());
    println!("  Type:             {}", detail.service_type.cyan());
    println!(
        "  Version:          {}",
        detail.version.clone().unwrap_or_else(|| "latest".to_string())
    );
    let status = if detail.status == "running" {
        detail.status.green()
    } else {
        detail.status.red()
    };
    println!("  Status:           {}", status);
    println!("  Username:         {}", detail.username.clone().unwrap_or_else(na));
    println!("  Password:         {}", detail.password.clone().unwrap_or_else(na));
    println!("  Database Name:    {}", detail.database_name.clone().unwrap_or_else(na));
    println!(
        "  External Port:    {}",
        detail
            .external_port
            .map(|p| p.to_string())
            .unwrap_or_else(na)
    );
    println!(
        "  Container:        {}",
        detail.container_name.clone().unwrap_or_else(na).dimmed()
    );
    if let Some(conn) = &detail.connection_string {
        println!("  Connection:       {}", conn.yellow());
    }
    if let Some(api_url) = &detail.api_url {
        println!("  API URL:          {}", api_url.blue());
    }
    println!();

    Ok(ExitCode::SUCCESS)
}

/// `dock db exec [name] [query]`
pub async fn exec(
    settings: &ApiSettings,
    name: Option<String>,
    query: Option<String>,
) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let Some(service) = select_service(&api, &creds.token, name).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    let query = match query {
        Some(query) => query,
        None => Input::new()
            .with_prompt("Enter SQL/command to execute")
            .validate_with(|input: &String| {
                if input.trim().is_empty() {
                    Err("Command cannot be empty.")
                } else {
                    Ok(())
                }
            })
            .interact_text()?,
    };

    run_query(&api, &creds.token, &service.id, &service.service_type, &query).await;
    Ok(ExitCode::SUCCESS)
}

/// `dock db connect [name]` — interactive query REPL.
pub async fn connect(settings: &ApiSettings, name: Option<String>) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let Some(service) = select_service(&api, &creds.token, name).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    // Details are display sugar; fall back to the listing entry.
    let detail = api.service_detail(&creds.token, &service.id).await.ok();
    let db_type = detail
        .as_ref()
        .map(|d| d.service_type.clone())
        .unwrap_or_else(|| service.service_type.clone());
    let db_name = detail.as_ref().and_then(|d| d.database_name.clone());
    let username = detail.as_ref().and_then(|d| d.username.clone());

    println!(
        "{}",
        format!("\n  Connected to {} ({})", service.name.cyan(), db_type).bold()
    );
    println!(
        "{}",
        format!(
            "  Database: {} | User: {}",
            db_name.clone().unwrap_or_else(|| "N/A".to_string()),
            username.unwrap_or_else(|| "N/A".to_string())
        )
        .dimmed()
    );
    println!(
        "{}",
        "  Type your queries below. Use \"exit\" or Ctrl+C to quit.\n".dimmed()
    );

    let prompt = db_prompt(&db_type, db_name.as_deref());
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
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") || input == "\\q"
        {
            println!("{}", "  Disconnected.".dimmed());
            break;
        }
        if input.eq_ignore_ascii_case("help") || input == "\\?" {
            print_db_help(&db_type);
            continue;
        }
        if input.eq_ignore_ascii_case("clear") || input == "\\!" {
            print!("\x1B[2J\x1B[H");
            continue;
        }

        run_query(&api, &creds.token, &service.id, &db_type, input).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// `dock db shell [name] [command]` — one-shot shell command inside the
/// service container.
pub async fn shell(
    settings: &ApiSettings,
    name: Option<String>,
    command: Option<String>,
) -> Result<ExitCode, CliError> {
    let creds = require_token().await?;
    let api = HttpClient::new(&settings.api_url)?;

    let Some(service) = select_service(&api, &creds.token, name).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    let command = match command {
        Some(command) => command,
        None => Input::new()
            .with_prompt("Enter shell command to execute")
            .validate_with(|input: &String| {
                if input.trim().is_empty() {
                    Err("Command cannot be empty.")
                } else {
                    Ok(())
                }
            })
            .interact_text()?,
    };

    match api
        .shell_in_service(&creds.token, &service.id, &command)
        .await
    {
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
            println!("{}", format!("Exec failed: {}", e).red());
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn select_service(
    api: &HttpClient,
    token: &str,
    name: Option<String>,
) -> Result<Option<Service>, CliError> {
    let services = api.list_services(token).await?;
    if services.is_empty() {
        println!(
            "{}",
            "No database services found. Create one from the dashboard first.".yellow()
        );
        return Ok(None);
    }

    if let Some(name) = name {
        let matched = services.iter().find(|s| s.name == name || s.id == name);
        return match matched {
            Some(service) => Ok(Some(service.clone())),
            None => {
                println!("{}", format!("Service \"{}\" not found.", name).red());
                let available: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
                println!(
                    "{}",
                    format!("Available: {}", available.join(", ")).dimmed()
                );
                Ok(None)
            }
        };
    }

    let labels: Vec<String> = services
        .iter()
        .map(|s| {
            format!(
                "{} ({}) - {}",
                s.name,
                s.service_type,
                if s.status == "running" {
                    s.status.green()
                } else {
                    s.status.red()
                }
            )
        })
        .collect();
    let index = Select::new()
        .with_prompt("Select a database service")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Some(services[index].clone()))
}

async fn run_query(api: &HttpClient, token: &str, service_id: &str, db_type: &str, input: &str) {
    let query = translate_backslash_command(input, db_type);

    match api.exec_in_service(token, service_id, &query).await {
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

fn db_prompt(db_type: &str, db_name: Option<&str>) -> String {
    let name = db_name.unwrap_or("db");
    match db_type {
        "postgres" => format!("{}=# ", name).cyan().to_string(),
        "mysql" => "mysql> ".cyan().to_string(),
        "mariadb" => format!("MariaDB [{}]> ", name).cyan().to_string(),
        "mongodb" => format!("{}> ", name).green().to_string(),
        "redis" => "redis> ".red().to_string(),
        other => format!("{}> ", other).white().to_string(),
    }
}

/// Translate psql-style backslash commands into plain SQL for postgres.
fn translate_backslash_command(input: &str, db_type: &str) -> String {
    if db_type != "postgres" {
        return input.to_string();
    }

    let trimmed = input.trim();
    match trimmed {
        "\\dt" => "SELECT tablename FROM pg_tables WHERE schemaname = 'public';".to_string(),
        "\\l" => "SELECT datname FROM pg_database WHERE datistemplate = false;".to_string(),
        "\\du" => "SELECT usename FROM pg_user;".to_string(),
        _ => {
            if let Some(table) = trimmed.strip_prefix("\\d ") {
                format!(
                    "SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = '{}';",
                    table.trim()
                )
            } else {
                input.to_string()
            }
        }
    }
}

fn print_db_help(db_type: &str) {
    println!("{}", "\n  Dock DB Shell Commands:\n".bold());
    println!("  exit, quit, \\q     Exit the shell");
    println!("  help, \\?           Show this help");
    println!("  clear, \\!          Clear the screen");
    println!();
    match db_type {
        "postgres" => {
            println!("{}", "  PostgreSQL tips:".dimmed());
            println!("{}", "    \\dt             List tables".dimmed());
            println!("{}", "    \\d <table>      Describe table".dimmed());
        }
        "mysql" | "mariadb" => {
            println!("{}", "  MySQL/MariaDB tips:".dimmed());
            println!("{}", "    SHOW TABLES;    List tables".dimmed());
            println!("{}", "    DESCRIBE <tbl>; Describe table".dimmed());
        }
        "mongodb" => {
            println!("{}", "  MongoDB tips:".dimmed());
            println!("{}", "    show collections   List collections".dimmed());
            println!("{}", "    db.col.find()      Query documents".dimmed());
        }
        "redis" => {
            println!("{}", "  Redis tips:".dimmed());
            println!("{}", "    KEYS *          List all keys".dimmed());
            println!("{}", "    GET <key>       Get a value".dimmed());
        }
        _ => {}
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslash_translation_postgres_only() {
        assert_eq!(
            translate_backslash_command("\\dt", "mysql"),
            "\\dt".to_string()
        );
        assert!(translate_backslash_command("\\dt", "postgres").contains("pg_tables"));
    }

    #[test]
    fn test_backslash_describe_table() {
        let sql = translate_backslash_command("\\d users", "postgres");
        assert!(sql.contains("information_schema.columns"));
        assert!(sql.contains("'users'"));
    }

    #[test]
    fn test_plain_sql_passes_through() {
        assert_eq!(
            translate_backslash_command("SELECT 1;", "postgres"),
            "SELECT 1;".to_string()
        );
    }
}
