//! Config file parsing for `~/.config/cover-resolver/config.toml`.
//!
//! Credentials may also come from the environment (`KAKAO_API_KEY`,
//! `NAVER_CLIENT_ID`, `NAVER_CLIENT_SECRET`); environment values win over the
//! file. Everything is read once, when the provider registry is built.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::probe::{DEFAULT_MAX_BYTES, DEFAULT_MIN_WIDTH};

pub const ENV_KAKAO_API_KEY: &str = "KAKAO_API_KEY";
pub const ENV_NAVER_CLIENT_ID: &str = "NAVER_CLIENT_ID";
pub const ENV_NAVER_CLIENT_SECRET: &str = "NAVER_CLIENT_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    #[serde(default)]
    pub custom_providers: Vec<CustomProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub kakao_api_key: Option<String>,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
}

/// Base URL overrides for the search APIs (proxies, test servers).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointsConfig {
    pub kakao: Option<String>,
    pub naver: Option<String>,
    pub google_books_api: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_min_width() -> u32 {
    DEFAULT_MIN_WIDTH
}
fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}
fn default_user_agent() -> String {
    concat!("cover-resolver/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            max_bytes: default_max_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Optional safety net over a whole resolution. Unset by default.
    pub deadline_ms: Option<u64>,
    #[serde(default = "default_crossfade_ms")]
    pub crossfade_ms: u64,
    #[serde(default = "default_direct_timeout_ms")]
    pub direct_timeout_ms: u64,
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    #[serde(default = "default_search_candidate_timeout_ms")]
    pub search_candidate_timeout_ms: u64,
    #[serde(default = "default_metadata_timeout_ms")]
    pub metadata_timeout_ms: u64,
    #[serde(default = "default_metadata_candidate_timeout_ms")]
    pub metadata_candidate_timeout_ms: u64,
    /// Provider names to skip entirely.
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn default_crossfade_ms() -> u64 {
    100
}
fn default_direct_timeout_ms() -> u64 {
    4000
}
fn default_search_timeout_ms() -> u64 {
    4000
}
fn default_search_candidate_timeout_ms() -> u64 {
    2000
}
fn default_metadata_timeout_ms() -> u64 {
    5000
}
fn default_metadata_candidate_timeout_ms() -> u64 {
    3000
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            deadline_ms: None,
            crossfade_ms: default_crossfade_ms(),
            direct_timeout_ms: default_direct_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            search_candidate_timeout_ms: default_search_candidate_timeout_ms(),
            metadata_timeout_ms: default_metadata_timeout_ms(),
            metadata_candidate_timeout_ms: default_metadata_candidate_timeout_ms(),
            disabled: Vec::new(),
        }
    }
}

impl ResolveConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn crossfade(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }

    pub fn is_disabled(&self, provider: &str) -> bool {
        self.disabled.iter().any(|d| d == provider)
    }
}

/// A user-defined JSON search provider, appended after the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    pub name: String,
    /// Request URL; `{isbn}` is replaced by the normalized ISBN.
    pub url: String,
    /// JSON path to the image URL, e.g. `$.results[0].imageUrl`.
    pub image_path: String,
    /// Extra request headers; `{credential}` in a value is replaced by the
    /// value of `credential_env`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Environment variable holding the credential. When set here but absent
    /// from the environment, the provider is disabled.
    pub credential_env: Option<String>,
    pub timeout_ms: Option<u64>,
    pub candidate_timeout_ms: Option<u64>,
}

impl AppConfig {
    /// Overlay credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay credentials from an arbitrary lookup (tests, embedding).
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = non_empty(ENV_KAKAO_API_KEY) {
            self.credentials.kakao_api_key = Some(v);
        }
        if let Some(v) = non_empty(ENV_NAVER_CLIENT_ID) {
            self.credentials.naver_client_id = Some(v);
        }
        if let Some(v) = non_empty(ENV_NAVER_CLIENT_SECRET) {
            self.credentials.naver_client_secret = Some(v);
        }
    }

    /// Set one `section.key` value, as used by `config set`.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let parts: Vec<&str> = key.splitn(2, '.').collect();
        match parts.as_slice() {
            ["credentials", sub] => match *sub {
                "kakao_api_key" => self.credentials.kakao_api_key = Some(value.to_string()),
                "naver_client_id" => self.credentials.naver_client_id = Some(value.to_string()),
                "naver_client_secret" => self.credentials.naver_client_secret = Some(value.to_string()),
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            },
            ["endpoints", sub] => match *sub {
                "kakao" => self.endpoints.kakao = Some(value.to_string()),
                "naver" => self.endpoints.naver = Some(value.to_string()),
                "google_books_api" => self.endpoints.google_books_api = Some(value.to_string()),
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            },
            ["probe", sub] => match *sub {
                "min_width" => self.probe.min_width = value.parse().map_err(|_| invalid())?,
                "max_bytes" => self.probe.max_bytes = value.parse().map_err(|_| invalid())?,
                "user_agent" => self.probe.user_agent = value.to_string(),
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            },
            ["resolve", sub] => {
                let ms = || value.parse::<u64>().map_err(|_| invalid());
                match *sub {
                    "deadline_ms" => self.resolve.deadline_ms = Some(ms()?),
                    "crossfade_ms" => self.resolve.crossfade_ms = ms()?,
                    "direct_timeout_ms" => self.resolve.direct_timeout_ms = ms()?,
                    "search_timeout_ms" => self.resolve.search_timeout_ms = ms()?,
                    "search_candidate_timeout_ms" => self.resolve.search_candidate_timeout_ms = ms()?,
                    "metadata_timeout_ms" => self.resolve.metadata_timeout_ms = ms()?,
                    "metadata_candidate_timeout_ms" => self.resolve.metadata_candidate_timeout_ms = ms()?,
                    "disabled" => {
                        self.resolve.disabled = value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    }
                    _ => return Err(ConfigError::UnknownKey(key.to_string())),
                }
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("cover-resolver");
        p.push("config.toml");
        p
    })
}

/// Read and parse a config file.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<AppConfig>(&content)?)
}

/// Write a config file, creating its directory.
pub fn save_config_to(cfg: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

/// [`config_path`], or an error when the platform has no config directory.
pub fn require_config_path() -> Result<PathBuf, ConfigError> {
    config_path().ok_or(ConfigError::NoConfigDir)
}

/// Set one key in the config file at `path`, keeping everything else.
///
/// A missing file starts from defaults. An unparsable file is an error and is
/// left untouched.
pub fn update_config_at(path: &Path, key: &str, value: &str) -> Result<AppConfig, ConfigError> {
    let mut cfg = if path.exists() {
        load_config_from(path)?
    } else {
        AppConfig::default()
    };
    cfg.set_key(key, value)?;
    save_config_to(&cfg, path)?;
    Ok(cfg)
}

/// Load config from the default path, then overlay the environment.
///
/// A missing file means defaults; an unparsable one is reported and ignored.
pub fn load_config() -> AppConfig {
    let mut cfg = match config_path() {
        Some(path) if path.exists() => match load_config_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                AppConfig::default()
            }
        },
        _ => AppConfig::default(),
    };
    cfg.apply_env();
    cfg
}
