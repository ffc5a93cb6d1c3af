//! Platform endpoint settings

use url::Url;

use crate::errors::CliError;

/// Platform endpoints, resolved once at startup and threaded into every
/// command explicitly.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL for the platform REST API
    pub api_url: String,

    /// Base URL for the web dashboard
    pub web_url: String,
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_web_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            web_url: default_web_url(),
        }
    }
}

impl ApiSettings {
    /// Resolve settings from `DOCK_API_URL` / `DOCK_WEB_URL`, falling back
    /// to the local development defaults.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("DOCK_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_api_url),
            web_url: std::env::var("DOCK_WEB_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_web_url),
        }
    }

    /// Dashboard page for a project.
    pub fn project_dashboard_url(&self, project_id: &str) -> String {
        format!("{}/projects/{}", self.web_url.trim_end_matches('/'), project_id)
    }

    /// Derive the realtime event endpoint from the API URL: http becomes ws,
    /// the `/ws` path is appended and the token rides along as a query param.
    pub fn event_url(&self, token: &str) -> Result<Url, CliError> {
        let mut url =
            Url::parse(&self.api_url).map_err(|e| CliError::ConfigError(e.to_string()))?;

        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => {
                return Err(CliError::ConfigError(
                    "Invalid API URL scheme".to_string(),
                ))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| CliError::ConfigError("Failed to set scheme".to_string()))?;

        url.set_path(&format!("{}/ws", url.path().trim_end_matches('/')));
        url.query_pairs_mut().append_pair("token", token);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_url_scheme_swap() {
        let settings = ApiSettings {
            api_url: "https://api.dock.build/api".to_string(),
            web_url: "https://dock.build".to_string(),
        };
        let url = settings.event_url("tok123").unwrap();
        assert_eq!(url.as_str(), "wss://api.dock.build/api/ws?token=tok123");
    }

    #[test]
    fn test_event_url_plain_http() {
        let settings = ApiSettings::default();
        let url = settings.event_url("t").unwrap();
        assert_eq!(url.scheme(), "ws");
        assert!(url.path().ends_with("/ws"));
    }

    #[test]
    fn test_event_url_rejects_other_schemes() {
        let settings = ApiSettings {
            api_url: "ftp://api.dock.build".to_string(),
            web_url: String::new(),
        };
        assert!(settings.event_url("t").is_err());
    }

    #[test]
    fn test_dashboard_url() {
        let settings = ApiSettings {
            api_url: "http://localhost:8080/api".to_string(),
            web_url: "http://localhost:3000/".to_string(),
        };
        assert_eq!(
            settings.project_dashboard_url("P1"),
            "http://localhost:3000/projects/P1"
        );
    }
}
