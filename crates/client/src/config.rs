//! Client configuration
//!
//! `app_id` and `project_version_id` identify the interactive project; they
//! are the only hard requirements. When the host leaves them unset they are
//! read once from a JSON config file with the keys `appid`,
//! `projectversionid` and optional `sharecode`.

use std::path::Path;

use serde::Deserialize;

use crate::error::ClientError;

/// Default REST endpoint of the interactive service.
pub const DEFAULT_API_BASE: &str = "https://api.stagelink.tv/v1";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client id, also the interactive app id.
    pub app_id: String,
    pub project_version_id: String,
    /// Grants access to a project shared with this client.
    pub share_code: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    appid: Option<String>,
    #[serde(default)]
    projectversionid: Option<String>,
    #[serde(default)]
    sharecode: Option<String>,
}

impl ClientConfig {
    pub fn new(app_id: impl Into<String>, project_version_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            project_version_id: project_version_id.into(),
            share_code: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_share_code(mut self, share_code: impl Into<String>) -> Self {
        self.share_code = Some(share_code.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Read a full configuration from a host config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let mut config = Self::new("", "");
        config.merge_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill unset fields from a host config file; set fields win.
    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<(), ClientError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ClientError::ConfigFile(e.to_string()))?;
        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|e| ClientError::ConfigFile(e.to_string()))?;

        if self.app_id.is_empty() {
            if let Some(appid) = file.appid {
                self.app_id = appid;
            }
        }
        if self.project_version_id.is_empty() {
            if let Some(projectversionid) = file.projectversionid {
                self.project_version_id = projectversionid;
            }
        }
        if self.share_code.is_none() {
            self.share_code = file.sharecode;
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.app_id.is_empty() {
            return Err(ClientError::MissingConfig("appid"));
        }
        if self.project_version_id.is_empty() {
            return Err(ClientError::MissingConfig("projectversionid"));
        }
        Ok(())
    }

    /// Key under which the token pair persists.
    pub(crate) fn storage_key(&self) -> String {
        format!("{}-{}", self.app_id, self.project_version_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, text: &str) -> std::path::PathBuf {
        let path =
            std::env::temp_dir().join(format!("stagelink-config-{}-{}", std::process::id(), name));
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_from_file_reads_all_keys() {
        let path = write_temp(
            "full.json",
            r#"{"appid":"A","projectversionid":"V","sharecode":"S"}"#,
        );
        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.app_id, "A");
        assert_eq!(config.project_version_id, "V");
        assert_eq!(config.share_code.as_deref(), Some("S"));
        assert_eq!(config.storage_key(), "A-V");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_project_version_is_fatal() {
        let path = write_temp("partial.json", r#"{"appid":"A"}"#);
        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::MissingConfig("projectversionid")));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_merge_keeps_set_fields() {
        let path = write_temp(
            "merge.json",
            r#"{"appid":"file-app","projectversionid":"file-version"}"#,
        );
        let mut config = ClientConfig::new("code-app", "");
        config.merge_file(&path).unwrap();
        assert_eq!(config.app_id, "code-app");
        assert_eq!(config.project_version_id, "file-version");
        let _ = std::fs::remove_file(path);
    }
}
