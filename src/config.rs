use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use url::Url;

use crate::error::{Result, TriageError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Microsoft identity platform settings
///
/// Tenant id, client id and redirect URI are required before the auth flow
/// can start; `validate()` is called by the auth controller at construction
/// and a failure there is fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    /// Optional; public clients omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_authority")]
    pub authority: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            authority: default_authority(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the analysis backend serving analyzed emails
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            fetch_limit: default_fetch_limit(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Maximum rows shown in the email list before truncation
    #[serde(default = "default_list_rows")]
    pub list_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            list_rows: default_list_rows(),
        }
    }
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/auth/callback".to_string()
}

fn default_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_feed_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_fetch_limit() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_list_rows() -> usize {
    25
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning; OAuth
        // settings can still arrive via environment variables
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            let mut config = Self::default();
            config.oauth.apply_env_overrides();
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| TriageError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.oauth.apply_env_overrides();
        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TriageError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TriageError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate the non-OAuth sections
    ///
    /// OAuth settings are validated separately by the auth controller, so
    /// commands that never touch the identity provider (init-config, status)
    /// work with a blank `[oauth]` table.
    pub fn validate(&self) -> Result<()> {
        if self.feed.base_url.is_empty() {
            return Err(TriageError::ConfigError(
                "feed.base_url cannot be empty".to_string(),
            ));
        }
        Url::parse(&self.feed.base_url).map_err(|e| {
            TriageError::ConfigError(format!("feed.base_url is not a valid URL: {}", e))
        })?;

        if self.feed.fetch_limit == 0 {
            return Err(TriageError::ConfigError(
                "feed.fetch_limit must be at least 1".to_string(),
            ));
        }
        if self.feed.timeout_secs == 0 {
            return Err(TriageError::ConfigError(
                "feed.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.dashboard.list_rows == 0 {
            return Err(TriageError::ConfigError(
                "dashboard.list_rows must be at least 1".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}

impl OAuthConfig {
    /// Environment overrides, highest precedence
    ///
    /// Variable names match the backend deployment: MICROSOFT_TENANT_ID,
    /// MICROSOFT_CLIENT_ID, MICROSOFT_CLIENT_SECRET, MICROSOFT_REDIRECT_URI.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(tenant) = env::var("MICROSOFT_TENANT_ID") {
            self.tenant_id = tenant;
        }
        if let Ok(client) = env::var("MICROSOFT_CLIENT_ID") {
            self.client_id = client;
        }
        if let Ok(secret) = env::var("MICROSOFT_CLIENT_SECRET") {
            self.client_secret = Some(secret);
        }
        if let Ok(redirect) = env::var("MICROSOFT_REDIRECT_URI") {
            self.redirect_uri = redirect;
        }
    }

    /// Reject missing or malformed OAuth settings
    ///
    /// Called at auth controller construction; failure here is fatal for any
    /// command that needs the identity provider.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.is_empty() {
            return Err(TriageError::ConfigError(
                "oauth.tenant_id is not set (or MICROSOFT_TENANT_ID)".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(TriageError::ConfigError(
                "oauth.client_id is not set (or MICROSOFT_CLIENT_ID)".to_string(),
            ));
        }

        let redirect = Url::parse(&self.redirect_uri).map_err(|e| {
            TriageError::ConfigError(format!("oauth.redirect_uri is not a valid URL: {}", e))
        })?;
        if redirect.host_str().is_none() {
            return Err(TriageError::ConfigError(
                "oauth.redirect_uri is missing a host".to_string(),
            ));
        }

        let authority = Url::parse(&self.authority).map_err(|e| {
            TriageError::ConfigError(format!("oauth.authority is not a valid URL: {}", e))
        })?;
        if authority.cannot_be_a_base() {
            return Err(TriageError::ConfigError(
                "oauth.authority must be an absolute URL".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    fn configured_oauth() -> OAuthConfig {
        OAuthConfig {
            tenant_id: "common".to_string(),
            client_id: "client-123".to_string(),
            client_secret: Some("secret".to_string()),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.oauth.tenant_id.is_empty());
        assert_eq!(config.oauth.redirect_uri, "http://localhost:3000/auth/callback");
        assert_eq!(config.oauth.authority, "https://login.microsoftonline.com");
        assert_eq!(config.feed.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.feed.fetch_limit, 50);
        assert_eq!(config.feed.timeout_secs, 30);
        assert_eq!(config.feed.max_retries, 3);
        assert_eq!(config.dashboard.list_rows, 25);
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_feed_url() {
        let mut config = Config::default();
        config.feed.base_url = "not a url".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("feed.base_url"));
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = Config::default();
        config.feed.fetch_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feed.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dashboard.list_rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oauth_validation_missing_tenant() {
        let mut oauth = configured_oauth();
        oauth.tenant_id.clear();
        let result = oauth.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("tenant_id"));
    }

    #[test]
    fn test_oauth_validation_missing_client() {
        let mut oauth = configured_oauth();
        oauth.client_id.clear();
        let result = oauth.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("client_id"));
    }

    #[test]
    fn test_oauth_validation_bad_redirect() {
        let mut oauth = configured_oauth();
        oauth.redirect_uri = "::not-a-url::".to_string();
        assert!(oauth.validate().is_err());
    }

    #[test]
    fn test_oauth_validation_ok() {
        assert!(configured_oauth().validate().is_ok());

        // No secret is fine for public clients
        let mut oauth = configured_oauth();
        oauth.client_secret = None;
        assert!(oauth.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("MICROSOFT_TENANT_ID", "env-tenant");
        env::set_var("MICROSOFT_CLIENT_ID", "env-client");
        env::set_var("MICROSOFT_REDIRECT_URI", "http://localhost:9999/cb");
        env::remove_var("MICROSOFT_CLIENT_SECRET");

        let mut oauth = OAuthConfig::default();
        oauth.apply_env_overrides();

        assert_eq!(oauth.tenant_id, "env-tenant");
        assert_eq!(oauth.client_id, "env-client");
        assert_eq!(oauth.redirect_uri, "http://localhost:9999/cb");
        assert_eq!(oauth.client_secret, None);

        env::remove_var("MICROSOFT_TENANT_ID");
        env::remove_var("MICROSOFT_CLIENT_ID");
        env::remove_var("MICROSOFT_REDIRECT_URI");
    }

    #[tokio::test]
    #[serial]
    async fn test_config_load_save_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let mut config = Config::default();
        config.oauth = configured_oauth();
        config.feed.fetch_limit = 10;
        config.save(path).await.unwrap();

        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.oauth.tenant_id, "common");
        assert_eq!(loaded.oauth.client_secret, Some("secret".to_string()));
        assert_eq!(loaded.feed.fetch_limit, 10);
    }

    #[tokio::test]
    #[serial]
    async fn test_config_load_nonexistent_returns_default() {
        let path = Path::new("/tmp/nonexistent-mail-triage-config-12345.toml");

        let config = Config::load(path).await.unwrap();
        assert_eq!(config.feed.fetch_limit, 50);
    }

    #[tokio::test]
    #[serial]
    async fn test_config_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        tokio::fs::write(path, "this is not valid toml {[}]")
            .await
            .unwrap();

        let result = Config::load(path).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    #[serial]
    async fn test_config_partial_with_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let partial_config = r#"
[oauth]
tenant_id = "contoso"
client_id = "abc"

[feed]
fetch_limit = 20
"#;
        tokio::fs::write(path, partial_config).await.unwrap();

        let config = Config::load(path).await.unwrap();

        assert_eq!(config.oauth.tenant_id, "contoso");
        assert_eq!(config.feed.fetch_limit, 20);

        // Defaults fill the rest
        assert_eq!(config.oauth.redirect_uri, "http://localhost:3000/auth/callback");
        assert_eq!(config.feed.timeout_secs, 30);
        assert_eq!(config.dashboard.list_rows, 25);
    }
}
