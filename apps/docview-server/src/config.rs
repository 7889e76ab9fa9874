//! Configuration management for DocView Server
//!
//! Configuration is resolved once at startup: built-in defaults, then an
//! optional TOML file, then environment variables. The resulting [`Config`]
//! is immutable and handed to the orchestrator and proxy through `AppState`.

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment variable naming an alternate configuration file
pub const CONFIG_FILE_ENV: &str = "DOCVIEW_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// A credential that must never be logged or echoed
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub proxy: ProxyConfig,
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of prebuilt client assets served as the router fallback
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<Secret>,
    pub secret_key: Option<Secret>,
    /// Header the API key is sent in on the outbound leg
    pub api_key_header: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub base_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8888,
            static_dir: None,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            secret_key: None,
            api_key_header: "apiKey".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            base_path: "/pas-proxy".to_string(),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        DocumentsConfig {
            root: PathBuf::from("documents"),
        }
    }
}

impl Config {
    /// Load configuration from file and process environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = non_empty(env::var(CONFIG_FILE_ENV).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(v) = get("API_KEY") {
            self.backend.api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("BACKEND_BASE_URL") {
            self.backend.base_url = v;
        }
        if let Some(v) = get("BACKEND_SECRET_KEY") {
            self.backend.secret_key = Some(Secret::new(v));
        }
        if let Some(v) = get("API_KEY_HEADER") {
            self.backend.api_key_header = v;
        }
        if let Some(v) = get("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().map_err(|_| ConfigError::Invalid {
                key: "BACKEND_TIMEOUT_SECS",
                message: format!("expected a number of seconds, got {:?}", v),
            })?;
        }
        if let Some(v) = get("PROXY_BASE_PATH") {
            self.proxy.base_path = v;
        }
        if let Some(v) = get("DOCUMENTS_DIR") {
            self.documents.root = PathBuf::from(v);
        }
        if let Some(v) = get("STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("SERVER_PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::Invalid {
                key: "SERVER_PORT",
                message: format!("expected a port number, got {:?}", v),
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.backend.base_url).map_err(|e| ConfigError::Invalid {
            key: "backend.base_url",
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(ConfigError::Invalid {
                key: "backend.base_url",
                message: format!("expected an absolute http(s) URL, got {}", self.backend.base_url),
            });
        }

        axum::http::HeaderName::from_bytes(self.backend.api_key_header.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                key: "backend.api_key_header",
                message: e.to_string(),
            }
        })?;

        let base_path = &self.proxy.base_path;
        if !base_path.starts_with('/') || base_path == "/" || base_path.ends_with('/') {
            return Err(ConfigError::Invalid {
                key: "proxy.base_path",
                message: format!(
                    "must start with '/', must not be '/' and must not end with '/', got {:?}",
                    base_path
                ),
            });
        }

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "backend.timeout_secs",
                message: "must be at least 1 second".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                key: "server.port",
                message: "must be nonzero".to_string(),
            });
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.proxy.base_path, "/pas-proxy");
        assert!(config.backend.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "http://file-backend:3000"
            api_key = "from-file"
            "#,
        )
        .unwrap();

        config
            .apply_overrides(lookup(&[
                ("API_KEY", "from-env"),
                ("BACKEND_SECRET_KEY", "s3cr3t"),
            ]))
            .unwrap();

        assert_eq!(config.backend.base_url, "http://file-backend:3000");
        assert_eq!(config.backend.api_key.as_ref().unwrap().expose(), "from-env");
        assert_eq!(config.backend.secret_key.as_ref().unwrap().expose(), "s3cr3t");
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = Config::default();
        config.backend.api_key = Some(Secret::new("kept"));
        config.apply_overrides(lookup(&[("API_KEY", "")])).unwrap();
        assert_eq!(config.backend.api_key.unwrap().expose(), "kept");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("SERVER_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SERVER_PORT", .. }));
    }

    #[test]
    fn test_validate_rejects_bad_base_path() {
        for path in ["pas-proxy", "/", "/pas-proxy/"] {
            let mut config = Config::default();
            config.proxy.base_path = path.to_string();
            assert!(config.validate().is_err(), "accepted {:?}", path);
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| (key == "BACKEND_TIMEOUT_SECS").then(|| "0".to_string()))
            .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "backend.timeout_secs", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_relative_backend_url() {
        let mut config = Config::default();
        config.backend.base_url = "localhost:3000/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let mut config = Config::default();
        config.backend.api_key = Some(Secret::new("super-secret-key"));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8888);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\nbase_url = ").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
