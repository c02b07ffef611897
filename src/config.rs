//! Configuration loaded from `scanflow.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `SCANFLOW_BASE_URL` and `SCANFLOW_API_TOKEN` take precedence over the file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::job::{DEFAULT_ALLOWED_CONTENT_TYPES, InputPolicy};
use crate::orchestrator::PollPolicy;

pub const CONFIG_FILE: &str = "scanflow.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanflowConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:8000/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upload content types the dispatcher accepts.
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,

    /// How long folder listings are cached, in seconds.
    #[serde(default = "default_image_cache_ttl_secs")]
    pub image_cache_ttl_secs: u64,

    /// Polling policy for upload-then-extract.
    #[serde(default = "PollPolicy::batch")]
    pub upload: PollPolicy,

    /// Polling policy for re-analyzing stored images.
    #[serde(default = "PollPolicy::interactive")]
    pub analyze: PollPolicy,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_allowed_content_types() -> Vec<String> {
    DEFAULT_ALLOWED_CONTENT_TYPES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_image_cache_ttl_secs() -> u64 {
    60
}

impl Default for ScanflowConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            allowed_content_types: default_allowed_content_types(),
            image_cache_ttl_secs: default_image_cache_ttl_secs(),
            upload: PollPolicy::batch(),
            analyze: PollPolicy::interactive(),
        }
    }
}

impl ScanflowConfig {
    /// Loads `scanflow.toml` from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads the given file, or defaults if it does not exist, then applies
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<ScanflowConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(
            std::env::var("SCANFLOW_BASE_URL").ok(),
            std::env::var("SCANFLOW_API_TOKEN").ok(),
        );
        Ok(config)
    }

    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, base_url: Option<String>, api_token: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.is_empty()) {
            self.base_url = url;
        }
        if let Some(token) = api_token.filter(|t| !t.is_empty()) {
            self.api_token = Some(token);
        }
    }

    pub fn input_policy(&self) -> InputPolicy {
        InputPolicy::new(self.allowed_content_types.iter().cloned())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn image_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.image_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ScanflowConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert!(config.api_token.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.upload, PollPolicy::batch());
        assert_eq!(config.analyze, PollPolicy::interactive());
        assert!(config.input_policy().allows("image/png"));
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            base_url = "https://forms.example.edu/api"
            allowed_content_types = ["image/png"]

            [upload]
            max_attempts = 10
            poll_interval_ms = 250
        "#;
        let config: ScanflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_url, "https://forms.example.edu/api");
        assert_eq!(config.upload.max_attempts, 10);
        assert_eq!(config.upload.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.analyze, PollPolicy::interactive());
        assert!(!config.input_policy().allows("image/jpeg"));
        assert_eq!(config.image_cache_ttl_secs, 60);
    }

    #[test]
    fn load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "request_timeout_secs = 5\n").unwrap();

        let config = ScanflowConfig::load_from(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 5);

        let missing = ScanflowConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(missing.request_timeout_secs, 30);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "request_timeout_secs = \"soon\"\n").unwrap();

        let err = ScanflowConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn overrides_win_unless_empty() {
        let mut config = ScanflowConfig::default();
        config.apply_overrides(Some("http://backend:9000".into()), Some(String::new()));
        assert_eq!(config.base_url, "http://backend:9000");
        assert!(config.api_token.is_none());

        config.apply_overrides(None, Some("tok".into()));
        assert_eq!(config.api_token.as_deref(), Some("tok"));
    }
}
