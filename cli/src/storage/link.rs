//! Project link file management
//!
//! The link file maps a working directory to a remote project. It lives at
//! `.dock/dock.json` inside the project root and holds nothing but the
//! project id.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CliError;
use crate::filesys::file::File;

/// Persisted mapping of a directory to a remote project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLink {
    #[serde(rename = "projectId")]
    pub project_id: String,
}

/// Link file for a project root: `<root>/.dock/dock.json`
pub fn link_file(root: &Path) -> File {
    File::new(root.join(".dock").join("dock.json"))
}

/// Read the linked project id, if the directory is linked.
///
/// An unreadable or malformed link file is treated as "not linked" rather
/// than an error; the caller falls back to interactive resolution.
pub async fn read_link(root: &Path) -> Option<String> {
    let file = link_file(root);
    if !file.exists().await {
        return None;
    }
    match file.read_json::<ProjectLink>().await {
        Ok(link) if !link.project_id.is_empty() => Some(link.project_id),
        _ => None,
    }
}

/// Persist the link for a project root.
pub async fn write_link(root: &Path, project_id: &str) -> Result<(), CliError> {
    link_file(root)
        .write_json(&ProjectLink {
            project_id: project_id.to_string(),
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_link_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_link(dir.path(), "P1").await.unwrap();

        // On-disk shape uses the platform's camelCase key
        let raw = link_file(dir.path()).read_string().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["projectId"], "P1");

        assert_eq!(read_link(dir.path()).await.as_deref(), Some("P1"));
    }

    #[tokio::test]
    async fn test_missing_link_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_link(dir.path()).await, None);
    }

    #[tokio::test]
    async fn test_malformed_link_is_none() {
        let dir = tempfile::tempdir().unwrap();
        link_file(dir.path()).write_string("not json").await.unwrap();
        assert_eq!(read_link(dir.path()).await, None);
    }
}
