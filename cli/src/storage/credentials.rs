//! Stored login credentials

use serde::{Deserialize, Serialize};

use crate::errors::CliError;
use crate::filesys::file::File;

/// Logged-in user info returned by the login callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
}

/// Credentials stored per user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// API bearer token
    pub token: String,

    /// User info, when the platform sent it along
    #[serde(default)]
    pub user: Option<User>,
}

/// Location of the credentials file: `<config_dir>/dock/credentials.json`
pub fn credentials_file() -> Result<File, CliError> {
    let dir = dirs::config_dir()
        .ok_or_else(|| CliError::ConfigError("Could not determine config directory".to_string()))?;
    Ok(File::new(dir.join("dock").join("credentials.json")))
}

/// Load stored credentials, if any.
pub async fn load_credentials() -> Result<Option<Credentials>, CliError> {
    let file = credentials_file()?;
    if !file.exists().await {
        return Ok(None);
    }
    let creds: Credentials = file.read_json().await?;
    if creds.token.is_empty() {
        return Ok(None);
    }
    Ok(Some(creds))
}

/// Persist credentials with owner-only permissions.
pub async fn save_credentials(creds: &Credentials) -> Result<(), CliError> {
    let file = credentials_file()?;
    file.write_json(creds).await?;
    file.set_permissions_600().await?;
    Ok(())
}

/// Remove stored credentials. Returns whoever was logged in.
pub async fn clear_credentials() -> Result<Option<User>, CliError> {
    let file = credentials_file()?;
    let user = if file.exists().await {
        file.read_json::<Credentials>().await.ok().and_then(|c| c.user)
    } else {
        None
    };
    file.delete().await?;
    Ok(user)
}

/// Fetch the stored token or fail with a "not logged in" error.
///
/// Every command that talks to the platform calls this before doing any work.
pub async fn require_token() -> Result<Credentials, CliError> {
    load_credentials().await?.ok_or(CliError::NotLoggedIn)
}

/// Override the credentials path for tests.
#[cfg(test)]
pub fn credentials_file_at(dir: &std::path::Path) -> File {
    File::new(dir.join("credentials.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credentials_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = credentials_file_at(dir.path());

        let creds = Credentials {
            token: "tok".to_string(),
            user: Some(User {
                username: Some("alice".to_string()),
            }),
        };
        file.write_json(&creds).await.unwrap();

        let loaded: Credentials = file.read_json().await.unwrap();
        assert_eq!(loaded.token, "tok");
        assert_eq!(loaded.user.unwrap().username.as_deref(), Some("alice"));
    }
}
