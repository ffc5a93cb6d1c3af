//! Database service endpoints

use serde::Deserialize;

use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::http::projects::ExecResult;

/// A managed database service
#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub service_type: String,

    #[serde(default)]
    pub status: String,
}

/// Full service details, including connection credentials
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDetail {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub service_type: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub database_name: Option<String>,

    #[serde(default)]
    pub external_port: Option<u16>,

    #[serde(default)]
    pub container_name: Option<String>,

    #[serde(default)]
    pub connection_string: Option<String>,

    #[serde(default)]
    pub api_url: Option<String>,
}

impl HttpClient {
    pub async fn list_services(&self, token: &str) -> Result<Vec<Service>, CliError> {
        self.get("/services", token).await
    }

    pub async fn service_detail(
        &self,
        token: &str,
        service_id: &str,
    ) -> Result<ServiceDetail, CliError> {
        self.get(&format!("/services/{}", service_id), token).await
    }

    /// Run a query against the database engine.
    pub async fn exec_in_service(
        &self,
        token: &str,
        service_id: &str,
        command: &str,
    ) -> Result<ExecResult, CliError> {
        self.post(
            &format!("/services/{}/exec", service_id),
            token,
            &serde_json::json!({ "command": command }),
        )
        .await
    }

    /// Run a shell command inside the service container.
    pub async fn shell_in_service(
        &self,
        token: &str,
        service_id: &str,
        command: &str,
    ) -> Result<ExecResult, CliError> {
        self.post(
            &format!("/services/{}/shell", service_id),
            token,
            &serde_json::json!({ "command": command }),
        )
        .await
    }
}
