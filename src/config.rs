// ABOUTME: Configuration loading for cofounder.
// ABOUTME: Reads ~/.cofounder/config.toml, then environment overrides, then CLI overrides.

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "CHAT_API_BASE_URL";
/// Environment variable holding the external dashboard URL.
pub const DASHBOARD_URL_ENV: &str = "EXTERNAL_DASHBOARD_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub templates: TemplatesConfig,
}

/// Backend endpoints and HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Where users are sent when no session can be established.
    pub dashboard_url: Option<String>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            dashboard_url: None,
            timeout_seconds: 120,
            connect_timeout_seconds: 10,
        }
    }
}

/// Local key/value storage (credentials and composer draft).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the default `~/.cofounder/storage.json`.
    pub path: Option<PathBuf>,
}

/// Template download settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Overrides the default download directory.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load config from ~/.cofounder/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `CHAT_API_BASE_URL` / `EXTERNAL_DASHBOARD_URL` when set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(DASHBOARD_URL_ENV).ok(),
        );
    }

    /// Apply explicit overrides; empty strings are ignored.
    pub fn apply_overrides(&mut self, base_url: Option<String>, dashboard_url: Option<String>) {
        if let Some(url) = base_url.filter(|s| !s.trim().is_empty()) {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = dashboard_url.filter(|s| !s.trim().is_empty()) {
            self.api.dashboard_url = Some(url);
        }
    }

    /// Root directory for cofounder's files.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cofounder")
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Path to the `.env`-style secrets file loaded at startup.
    pub fn secrets_env_path() -> PathBuf {
        Self::home_dir().join("secrets.env")
    }

    /// Path to the log file (the TUI owns stdout/stderr).
    pub fn log_path() -> PathBuf {
        Self::home_dir().join("cofounder.log")
    }

    /// Resolved storage file path.
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| Self::home_dir().join("storage.json"))
    }

    /// Resolved template download directory.
    pub fn templates_dir(&self) -> PathBuf {
        self.templates.dir.clone().unwrap_or_else(|| {
            dirs::download_dir().unwrap_or_else(|| Self::home_dir().join("templates"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.api.dashboard_url.is_none());
        assert_eq!(config.api.timeout_seconds, 120);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
[api]
base_url = "https://api.example.com"
dashboard_url = "https://dashboard.example.com"
timeout_seconds = 30

[storage]
path = "/tmp/cofounder-storage.json"

[templates]
dir = "/tmp/templates"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(
            config.api.dashboard_url.as_deref(),
            Some("https://dashboard.example.com")
        );
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(
            config.storage_path(),
            PathBuf::from("/tmp/cofounder-storage.json")
        );
        assert_eq!(config.templates_dir(), PathBuf::from("/tmp/templates"));
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml_str = r#"
[api]
base_url = "https://api.example.com"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.connect_timeout_seconds, 10);
        assert!(config.api.dashboard_url.is_none());
    }

    #[test]
    fn overrides_trim_trailing_slash_and_skip_empty() {
        let mut config = Config::default();
        config.apply_overrides(Some("https://api.example.com/".to_string()), Some(String::new()));
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert!(config.api.dashboard_url.is_none());

        config.apply_overrides(None, Some("https://dash.example.com".to_string()));
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(
            config.api.dashboard_url.as_deref(),
            Some("https://dash.example.com")
        );
    }
}
