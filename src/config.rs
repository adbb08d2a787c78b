//! Configuration file parser for ~/.config/leadfeed/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning, since they are
//! usually typos.
use crate::feed::{Endpoints, FeedLimits};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable holding the API token. Takes precedence over the file.
pub const API_TOKEN_ENV: &str = "LEADFEED_API_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks `api_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content API base URL. HTTPS is required except for localhost.
    pub base_url: String,

    /// Bearer token for the content API (alternative to `LEADFEED_API_TOKEN`).
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Retries for 429/5xx responses and transient network errors.
    pub max_retries: u32,

    pub lead_limit: usize,
    pub page_limit: usize,
    pub archive_page_limit: usize,

    /// Drop page items that repeat a lead item even if the server sent them.
    pub refilter_pages: bool,

    /// API path templates.
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        let limits = FeedLimits::default();
        Self {
            base_url: String::new(),
            api_token: None,
            request_timeout_secs: 30,
            max_retries: 3,
            lead_limit: limits.lead,
            page_limit: limits.page,
            archive_page_limit: limits.archive_page,
            refilter_pages: true,
            endpoints: Endpoints::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("lead_limit", &self.lead_limit)
            .field("page_limit", &self.page_limit)
            .field("archive_page_limit", &self.archive_page_limit)
            .field("refilter_pages", &self.refilter_pages)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "base_url",
        "api_token",
        "request_timeout_secs",
        "max_retries",
        "lead_limit",
        "page_limit",
        "archive_page_limit",
        "refilter_pages",
        "endpoints",
    ];

    const KNOWN_ENDPOINT_KEYS: [&'static str; 7] = [
        "category",
        "subcategory",
        "category_list",
        "lead",
        "subcategory_lead",
        "page",
        "archive",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses TOML text; blank input yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        Ok(toml::from_str(content)?)
    }

    /// API token from `LEADFEED_API_TOKEN`, falling back to the file's `api_token`.
    pub fn resolved_api_token(&self) -> Option<SecretString> {
        pick_token(std::env::var(API_TOKEN_ENV).ok(), self.api_token.as_deref())
    }

    pub fn limits(&self) -> FeedLimits {
        FeedLimits {
            lead: self.lead_limit,
            page: self.page_limit,
            archive_page: self.archive_page_limit,
        }
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for key in raw.keys() {
        if !Config::KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }
    if let Some(toml::Value::Table(endpoints)) = raw.get("endpoints") {
        for key in endpoints.keys() {
            if !Config::KNOWN_ENDPOINT_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Unknown key in [endpoints], ignoring");
            }
        }
    }
}

fn pick_token(env: Option<String>, file: Option<&str>) -> Option<SecretString> {
    env.filter(|t| !t.trim().is_empty())
        .or_else(|| file.filter(|t| !t.trim().is_empty()).map(str::to_string))
        .map(|t| SecretString::from(t.trim().to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::EntityId;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.base_url.is_empty());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.limits(), FeedLimits::default());
        assert!(config.refilter_pages);
        assert!(config.api_token.is_none());
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/leadfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.page_limit, 6);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = std::env::temp_dir().join("leadfeed_config_test_whitespace");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.lead_limit, 10);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::parse("base_url = \"https://news.example.com/api\"\n").unwrap();
        assert_eq!(config.base_url, "https://news.example.com/api");
        assert_eq!(config.archive_page_limit, 12); // default
        assert!(config.refilter_pages); // default
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("leadfeed_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
base_url = "https://news.example.com/api/v1"
api_token = "token-123"
request_timeout_secs = 10
max_retries = 1
lead_limit = 8
page_limit = 4
archive_page_limit = 20
refilter_pages = false

[endpoints]
lead = "inner-category-content/{category_id}/{limit}"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "https://news.example.com/api/v1");
        assert_eq!(config.api_token.as_deref(), Some("token-123"));
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.max_retries, 1);
        assert_eq!(
            config.limits(),
            FeedLimits {
                lead: 8,
                page: 4,
                archive_page: 20
            }
        );
        assert!(!config.refilter_pages);
        assert_eq!(
            config.endpoints.lead,
            "inner-category-content/{category_id}/{limit}"
        );
        // Unset endpoints keep their defaults
        assert_eq!(config.endpoints.page, "inner-category-content-more");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_subcategory_lead_endpoint() {
        let content = r#"
[endpoints]
lead = "inner-category-content/{category_id}/{limit}"
subcategory_lead = "inner-sub-category-content/{category_id}/{limit}"
"#;
        let config = Config::parse(content).unwrap();

        assert!(Config::KNOWN_ENDPOINT_KEYS.contains(&"subcategory_lead"));
        assert_eq!(
            config
                .endpoints
                .subcategory_lead_path(&EntityId::Number(21), 10)
                .unwrap(),
            "inner-sub-category-content/21/10"
        );
        assert_eq!(
            config.endpoints.lead_path(&EntityId::Number(7), 10).unwrap(),
            "inner-category-content/7/10"
        );
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = r#"
base_url = "https://news.example.com"
totally_fake_key = "should not fail"

[endpoints]
typo = "x"
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.base_url, "https://news.example.com");
    }

    #[test]
    fn test_wrong_type_returns_error() {
        // page_limit should be an integer
        assert!(Config::parse("page_limit = \"six\"\n").is_err());
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("leadfeed_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_api_token() {
        let config = Config {
            api_token: Some("super-secret-token-12345".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_token_takes_precedence() {
        let token = pick_token(Some("from-env".into()), Some("from-file")).unwrap();
        assert_eq!(token.expose_secret(), "from-env");
    }

    #[test]
    fn test_file_token_used_without_env() {
        let token = pick_token(None, Some(" from-file ")).unwrap();
        assert_eq!(token.expose_secret(), "from-file");

        let token = pick_token(Some("   ".into()), Some("from-file")).unwrap();
        assert_eq!(token.expose_secret(), "from-file");
    }

    #[test]
    fn test_no_token() {
        assert!(pick_token(None, None).is_none());
        assert!(pick_token(None, Some("")).is_none());
    }
}
