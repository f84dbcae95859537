//! Centralized configuration for fwdnet.
//!
//! Fixed tuning knobs live on [`SyncConfig`]; connection settings for a
//! Forward instance are loaded into [`ForwardConfig`] from an optional JSON
//! file with `FORWARD_*` environment variables taking precedence.

use crate::error::{FwdError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Network and sync tuning constants.
pub struct SyncConfig;

impl SyncConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const CATALOG_MAX_RETRIES: u32 = 3;
    pub const DETAIL_MAX_RETRIES: u32 = 2;
    pub const CRUD_MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(60);
    pub const PROGRESS_INTERVAL: usize = 100;
    pub const MAX_DETAIL_CONCURRENCY: usize = 16;
    pub const USER_AGENT: &'static str = "fwdnet/0.1";
    pub const CONFIG_DIR_NAME: &'static str = "fwdnet";
    pub const CONFIG_FILE_NAME: &'static str = "config.json";
}

const ENV_API_URL: &str = "FORWARD_API_URL";
const ENV_API_KEY: &str = "FORWARD_API_KEY";
const ENV_API_SECRET: &str = "FORWARD_API_SECRET";
const ENV_INSECURE: &str = "FORWARD_INSECURE_SKIP_VERIFY";
const ENV_CA_CERT: &str = "FORWARD_CA_CERT_PATH";
const ENV_TIMEOUT: &str = "FORWARD_TIMEOUT_SECS";
const ENV_CONCURRENCY: &str = "FORWARD_SYNC_CONCURRENCY";

const DEFAULT_API_URL: &str = "https://fwd.app";

/// On-disk layout of the JSON config file. Every field is optional so env
/// variables can fill the gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    api_url: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    insecure_skip_verify: Option<bool>,
    ca_cert_path: Option<PathBuf>,
    timeout_secs: Option<u64>,
    sync_concurrency: Option<usize>,
}

/// Connection settings for one Forward instance.
#[derive(Clone)]
pub struct ForwardConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub insecure_skip_verify: bool,
    pub ca_cert_path: Option<PathBuf>,
    pub request_timeout: Duration,
    /// Detail fetches in flight per repository; 1 keeps catalog order.
    pub sync_concurrency: usize,
}

impl std::fmt::Debug for ForwardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("ca_cert_path", &self.ca_cert_path)
            .field("request_timeout", &self.request_timeout)
            .field("sync_concurrency", &self.sync_concurrency)
            .finish()
    }
}

impl ForwardConfig {
    /// Build a config with default timeouts for the given credentials.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            insecure_skip_verify: false,
            ca_cert_path: None,
            request_timeout: SyncConfig::REQUEST_TIMEOUT,
            sync_concurrency: 1,
        }
    }

    /// Default config file location (`~/.config/fwdnet/config.json` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(SyncConfig::CONFIG_DIR_NAME)
                .join(SyncConfig::CONFIG_FILE_NAME)
        })
    }

    /// Load from `path` (or the default location if it exists), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        Self::resolve(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Resolve from an optional file plus an arbitrary variable lookup.
    pub fn resolve(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = match path {
            Some(p) => read_config_file(p)?,
            None => ConfigFile::default(),
        };

        let env = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = env(ENV_API_URL)
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_key = env(ENV_API_KEY).or(file.api_key).ok_or_else(|| FwdError::Config {
            message: format!("API key missing: set {} or apiKey", ENV_API_KEY),
        })?;
        let api_secret = env(ENV_API_SECRET)
            .or(file.api_secret)
            .ok_or_else(|| FwdError::Config {
                message: format!("API secret missing: set {} or apiSecret", ENV_API_SECRET),
            })?;

        let insecure_skip_verify = match env(ENV_INSECURE) {
            Some(v) => parse_bool(ENV_INSECURE, &v)?,
            None => file.insecure_skip_verify.unwrap_or(false),
        };
        let ca_cert_path = env(ENV_CA_CERT).map(PathBuf::from).or(file.ca_cert_path);
        let timeout_secs = match env(ENV_TIMEOUT) {
            Some(v) => parse_number::<u64>(ENV_TIMEOUT, &v)?,
            None => file
                .timeout_secs
                .unwrap_or(SyncConfig::REQUEST_TIMEOUT.as_secs()),
        };
        let sync_concurrency = match env(ENV_CONCURRENCY) {
            Some(v) => parse_number::<usize>(ENV_CONCURRENCY, &v)?,
            None => file.sync_concurrency.unwrap_or(1),
        };

        let config = Self {
            api_url,
            api_key,
            api_secret,
            insecure_skip_verify,
            ca_cert_path,
            request_timeout: Duration::from_secs(timeout_secs),
            sync_concurrency,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that would otherwise surface as confusing request errors.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url).map_err(|e| FwdError::Config {
            message: format!("Invalid API URL {}: {}", self.api_url, e),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FwdError::Config {
                message: format!("Unsupported URL scheme: {}", url.scheme()),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(FwdError::Config {
                message: "Request timeout must be positive".to_string(),
            });
        }
        if self.sync_concurrency == 0 || self.sync_concurrency > SyncConfig::MAX_DETAIL_CONCURRENCY {
            return Err(FwdError::Config {
                message: format!(
                    "Sync concurrency must be between 1 and {}",
                    SyncConfig::MAX_DETAIL_CONCURRENCY
                ),
            });
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| FwdError::io_with_path(e, path))?;
    serde_json::from_str(&contents).map_err(|e| FwdError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(FwdError::Config {
            message: format!("{} must be a boolean, got {:?}", key, other),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| FwdError::Config {
        message: format!("{} must be a non-negative integer, got {:?}", key, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_from_env_only() {
        let config = ForwardConfig::resolve(
            None,
            lookup_from(&[(ENV_API_KEY, "key"), (ENV_API_SECRET, "secret")]),
        )
        .unwrap();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.api_key, "key");
        assert_eq!(config.request_timeout, SyncConfig::REQUEST_TIMEOUT);
        assert_eq!(config.sync_concurrency, 1);
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"apiUrl": "https://fwd.example.com", "apiKey": "file-key",
                "apiSecret": "file-secret", "timeoutSecs": 5, "insecureSkipVerify": true}"#,
        )
        .unwrap();

        let config = ForwardConfig::resolve(
            Some(&path),
            lookup_from(&[(ENV_API_KEY, "env-key"), (ENV_INSECURE, "false")]),
        )
        .unwrap();

        assert_eq!(config.api_url, "https://fwd.example.com");
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.api_secret, "file-secret");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let err = ForwardConfig::resolve(None, lookup_from(&[(ENV_API_KEY, "key")])).unwrap_err();
        assert!(matches!(err, FwdError::Config { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [(ENV_API_KEY, "key"), (ENV_API_SECRET, "secret")];

        let mut vars = base.to_vec();
        vars.push((ENV_API_URL, "ftp://fwd.example.com"));
        assert!(ForwardConfig::resolve(None, lookup_from(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push((ENV_INSECURE, "maybe"));
        assert!(ForwardConfig::resolve(None, lookup_from(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push((ENV_CONCURRENCY, "0"));
        assert!(ForwardConfig::resolve(None, lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ForwardConfig::new("https://fwd.app", "key", "top-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = ForwardConfig::resolve(Some(&path), lookup_from(&[])).unwrap_err();
        assert!(matches!(err, FwdError::Config { .. }));
    }
}
