//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default client id (can be overridden at compile time via FINDMYSONG_CLIENT_ID env var).
pub const DEFAULT_CLIENT_ID: &str = match option_env!("FINDMYSONG_CLIENT_ID") {
    Some(id) => id,
    None => "findmysong-dev-client",
};

/// Default redirect URI intercepted by the login web view.
pub const DEFAULT_REDIRECT_URI: &str = match option_env!("FINDMYSONG_REDIRECT_URI") {
    Some(uri) => uri,
    None => "findmysong://callback",
};

/// Provider authorize endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// Provider token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Base URL for profile, top items and search.
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";

/// Scopes requested during interactive login.
pub const DEFAULT_SCOPES: &[&str] = &["user-read-private", "user-read-email", "user-top-read"];

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "FINDMYSONG_LOG_LEVEL";
const ENV_CLIENT_ID: &str = "FINDMYSONG_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "FINDMYSONG_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "FINDMYSONG_REDIRECT_URI";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OAuth client id registered with the provider.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// OAuth client secret. Sent as HTTP Basic credentials when present.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Redirect URI carrying the authorization code back to the app.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Provider authorize endpoint.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// Provider token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Base URL of the downstream web API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Scopes requested at login.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Timeout applied to every HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            client_id: default_client_id(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            scopes: default_scopes(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Blank values are ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(client_id) = get(ENV_CLIENT_ID) {
            self.client_id = client_id;
        }
        if let Some(secret) = get(ENV_CLIENT_SECRET) {
            self.client_secret = Some(secret);
        }
        if let Some(redirect) = get(ENV_REDIRECT_URI) {
            self.redirect_uri = redirect;
        }
    }

    /// Check that required values are present and every URL parses.
    pub fn validate(&self) -> CoreResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(CoreError::Config("client_id must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.redirect_uri()?;
        self.authorize_url()?;
        self.token_url()?;
        self.api_base_url()?;
        Ok(())
    }

    /// Get the redirect URI as a parsed URL.
    pub fn redirect_uri(&self) -> CoreResult<Url> {
        Url::parse(&self.redirect_uri).map_err(CoreError::from)
    }

    /// Get the authorize endpoint as a parsed URL.
    pub fn authorize_url(&self) -> CoreResult<Url> {
        Url::parse(&self.authorize_url).map_err(CoreError::from)
    }

    /// Get the token endpoint as a parsed URL.
    pub fn token_url(&self) -> CoreResult<Url> {
        Url::parse(&self.token_url).map_err(CoreError::from)
    }

    /// Get the web API base as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
