use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::ConnectionProfile;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
            upload_timeout_secs: default_upload_timeout_secs(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5002".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_upload_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_core_name")]
    pub core_name: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            core_name: default_core_name(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> String {
    "8983".to_string()
}
fn default_core_name() -> String {
    "document_store".to_string()
}

impl ProfileConfig {
    pub fn to_profile(&self) -> ConnectionProfile {
        ConnectionProfile::new(&self.host, &self.port, &self.core_name)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_allowed_media_types")]
    pub allowed_media_types: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            allowed_media_types: default_allowed_media_types(),
        }
    }
}

fn default_allowed_media_types() -> Vec<String> {
    vec!["application/json".to_string()]
}

impl Config {
    /// All-defaults configuration, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate backend
    let url = config.backend.url.trim();
    if url.is_empty() {
        anyhow::bail!("backend.url must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "backend.url must start with http:// or https://, got '{}'",
            config.backend.url
        );
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }
    if config.backend.upload_timeout_secs == 0 {
        anyhow::bail!("backend.upload_timeout_secs must be > 0");
    }

    // Validate analysis
    if config.analysis.allowed_media_types.is_empty() {
        anyhow::bail!("analysis.allowed_media_types must list at least one media type");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.backend.url, "http://localhost:5002");
        assert_eq!(cfg.backend.timeout_secs, 30);
        assert_eq!(cfg.profile.to_profile().label(), "document_store@localhost:8983");
        assert_eq!(cfg.analysis.allowed_media_types, vec!["application/json"]);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = parse_config(
            r#"
[backend]
url = "http://10.0.0.5:5002"
timeout_secs = 5

[profile]
host = "solr.internal"
core_name = "docs"
"#,
        )
        .unwrap();
        assert_eq!(cfg.backend.url, "http://10.0.0.5:5002");
        assert_eq!(cfg.backend.timeout_secs, 5);
        assert_eq!(cfg.backend.upload_timeout_secs, 120);
        assert_eq!(cfg.profile.host, "solr.internal");
        assert_eq!(cfg.profile.port, "8983");
        assert_eq!(cfg.profile.core_name, "docs");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = parse_config("[backend]\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn non_http_url_rejected() {
        let err = parse_config("[backend]\nurl = \"localhost:5002\"\n").unwrap_err();
        assert!(err.to_string().contains("backend.url"));
    }

    #[test]
    fn missing_file_is_minimal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.backend.url, "http://localhost:5002");
    }
}
