//! # Hub Configuration
//!
//! `folio-hub.toml` sections, their defaults, and the environment variables
//! that override secrets at startup.

use std::path::{Path, PathBuf};

use folio_core::dispatch::{DispatchConfig, DEFAULT_BATCH_SIZE};
use serde::Deserialize;
use thiserror::Error;

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";
pub const MAPBOX_BASE_URL: &str = "https://api.mapbox.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ServerConfig {
    /// Directory holding `<collection>.json` arrays loaded at startup.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Built web UI served for any path no route claims.
    #[serde(default)]
    pub ui_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    SendGrid,
    /// Accept every message and write it to the log.
    #[default]
    Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    #[serde(default)]
    pub provider: MailProvider,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_mail_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::default(),
            from: None,
            api_key: None,
            endpoint: default_mail_endpoint(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Collections reachable through `/api/{collection}`.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
    #[serde(default = "default_recipient_collection")]
    pub recipient_collection: String,
    #[serde(default = "default_email_field")]
    pub email_field: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            collections: default_collections(),
            recipient_collection: default_recipient_collection(),
            email_field: default_email_field(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapsConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_maps_base_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetentionConfig {
    #[serde(default = "default_questionnaire_days")]
    pub questionnaire_days: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            questionnaire_days: default_questionnaire_days(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_mail_endpoint() -> String {
    SENDGRID_ENDPOINT.into()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_collections() -> Vec<String> {
    vec!["books".into(), "users".into()]
}
fn default_recipient_collection() -> String {
    "users".into()
}
fn default_email_field() -> String {
    "email".into()
}
fn default_maps_base_url() -> String {
    MAPBOX_BASE_URL.into()
}
fn default_questionnaire_days() -> i64 {
    30
}
fn default_sweep_interval() -> u64 {
    86_400
}

// =============================================================================
// Loading
// =============================================================================

impl Config {
    /// Read `path` if it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `SENDGRID_API_KEY`, `MAIL_FROM` and `MAPBOX_TOKEN` from the
    /// process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any lookup; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("SENDGRID_API_KEY") {
            self.mail.api_key = Some(key);
        }
        if let Some(from) = var("MAIL_FROM") {
            self.mail.from = Some(from);
        }
        if let Some(token) = var("MAPBOX_TOKEN") {
            self.maps.token = Some(token);
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            from: self.mail.from.clone().unwrap_or_default(),
            batch_size: self.mail.batch_size.max(1),
            recipient_collection: self.search.recipient_collection.clone(),
            email_field: self.search.email_field.clone(),
        }
    }

    /// True when `collection` may be queried over HTTP.
    pub fn is_searchable(&self, collection: &str) -> bool {
        self.search.collections.iter().any(|c| c == collection)
    }

    /// Message returned for collections outside the searchable set.
    pub fn unknown_resource_message(&self) -> String {
        let routes: Vec<String> = self
            .search
            .collections
            .iter()
            .map(|c| format!("/api/{c}"))
            .collect();
        format!("Unknown resource. Use {}", routes.join(" or "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(Path::new("/nonexistent/folio-hub.toml")).unwrap();
        assert_eq!(config.mail.provider, MailProvider::Log);
        assert_eq!(config.mail.batch_size, 200);
        assert_eq!(config.search.collections, ["books", "users"]);
        assert_eq!(config.retention.questionnaire_days, 30);
        assert_eq!(config.maps.base_url, MAPBOX_BASE_URL);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
            [mail]
            provider = "sendgrid"
            from = "noreply@example.com"
            batch_size = 50

            [search]
            collections = ["books"]
            "#,
        )
        .unwrap();
        assert_eq!(config.mail.provider, MailProvider::SendGrid);
        assert_eq!(config.mail.endpoint, SENDGRID_ENDPOINT);
        assert_eq!(config.search.recipient_collection, "users");

        let dispatch = config.dispatch_config();
        assert_eq!(dispatch.from, "noreply@example.com");
        assert_eq!(dispatch.batch_size, 50);
        assert_eq!(config.unknown_resource_message(), "Unknown resource. Use /api/books");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio-hub.toml");
        std::fs::write(&path, "[mail\nprovider = 1").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides_secrets() {
        let env: HashMap<&str, &str> = [
            ("SENDGRID_API_KEY", "SG.key"),
            ("MAIL_FROM", "ops@example.com"),
            ("MAPBOX_TOKEN", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.maps.token = Some("pk.file".into());
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.mail.api_key.as_deref(), Some("SG.key"));
        assert_eq!(config.mail.from.as_deref(), Some("ops@example.com"));
        assert_eq!(config.maps.token.as_deref(), Some("pk.file"));
        assert_eq!(
            config.unknown_resource_message(),
            "Unknown resource. Use /api/books or /api/users"
        );
    }
}
