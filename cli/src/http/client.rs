//! HTTP client implementation

use std::path::Path;
use std::time::Duration;

use reqwest::{header, multipart, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::CliError;

/// Per-request timeout for plain API calls. Uploads and downloads carry no
/// timeout; they complete or fail on their own.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for platform communication
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Download a binary response body.
    pub async fn get_bytes(&self, path: &str, token: &str) -> Result<Vec<u8>, CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} (binary)", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Upload a local file as the `file` part of a multipart POST.
    ///
    /// The whole file is read and sent as one request body; nothing is
    /// streamed, so the server either receives the complete archive or an
    /// error.
    pub async fn post_file(
        &self,
        path: &str,
        token: &str,
        file_path: &Path,
    ) -> Result<(), CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (multipart upload)", url);

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zip".to_string());
        let bytes = tokio::fs::read(file_path).await?;

        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("application/zip")
                .map_err(|e| CliError::Internal(e.to_string()))?,
        );

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .multipart(form)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

/// Map a non-2xx response to `CliError::ApiError`, pulling the message out
/// of the platform's `{"error": ...}` body shape when present.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("HTTP request failed: {} - {}", status, body);

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body
            }
        });

    Err(CliError::ApiError {
        status: status.as_u16(),
        message,
    })
}
