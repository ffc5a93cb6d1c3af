//! Project endpoints

use serde::{Deserialize, Serialize};

use crate::errors::CliError;
use crate::http::client::HttpClient;

/// A hosted project as returned by the platform
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub project_type: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub subdomain: Option<String>,

    #[serde(default)]
    pub custom_domain: Option<String>,

    #[serde(default)]
    pub github_repo: Option<String>,
}

impl Project {
    /// Human label used in interactive pickers.
    pub fn label(&self) -> String {
        match &self.github_repo {
            Some(repo) => format!("{} ({})", self.name, repo),
            None => self.name.clone(),
        }
    }

    /// Domain shown in listings, preferring a custom domain.
    pub fn domain(&self) -> &str {
        self.custom_domain
            .as_deref()
            .or(self.subdomain.as_deref())
            .unwrap_or("")
    }
}

/// Request body for project creation
#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
    pub name: String,

    #[serde(rename = "type")]
    pub project_type: String,

    /// The platform would normally kick off a first deploy on creation; the
    /// CLI uploads its own archive right after, so that one is skipped.
    pub skip_deploy: bool,
}

/// Result of running a command inside a project container
#[derive(Debug, Clone, Deserialize)]
pub struct ExecResult {
    #[serde(default)]
    pub output: String,

    #[serde(default)]
    pub exit_code: i32,
}

impl HttpClient {
    pub async fn list_projects(&self, token: &str) -> Result<Vec<Project>, CliError> {
        self.get("/projects", token).await
    }

    pub async fn create_project(
        &self,
        token: &str,
        new_project: &NewProject,
    ) -> Result<Project, CliError> {
        self.post("/projects", token, new_project).await
    }

    /// Upload the packaged archive and trigger a deployment.
    pub async fn deploy_file(
        &self,
        token: &str,
        project_id: &str,
        archive_path: &std::path::Path,
    ) -> Result<(), CliError> {
        self.post_file(
            &format!("/projects/{}/deploy-file", project_id),
            token,
            archive_path,
        )
        .await
    }

    pub async fn exec_in_project(
        &self,
        token: &str,
        project_id: &str,
        command: &str,
    ) -> Result<ExecResult, CliError> {
        self.post(
            &format!("/projects/{}/exec", project_id),
            token,
            &serde_json::json!({ "command": command }),
        )
        .await
    }

    /// Download a project's files as a zip archive.
    pub async fn download_project(
        &self,
        token: &str,
        project_id: &str,
    ) -> Result<Vec<u8>, CliError> {
        self.get_bytes(&format!("/projects/{}/download", project_id), token)
            .await
    }
}
