//! Server configuration.
//!
//! Values are layered: TOML file, then `PANOS_*` environment variables, then
//! command-line flags. Later layers win; empty values count as unset.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use panos_mcp_server::OutputFormat;
use secrecy::SecretString;
use serde::Deserialize;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const HOSTNAME_VAR: &str = "PANOS_HOSTNAME";
const API_KEY_VAR: &str = "PANOS_API_KEY";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolved settings.
#[derive(Debug)]
pub struct Settings {
    pub hostname: String,
    pub api_key: SecretString,
    pub debug: bool,
    pub verify_ssl: bool,
    pub timeout: Duration,
    pub output_format: OutputFormat,
    pub cache_target_kind: bool,
    pub listen_addr: SocketAddr,
}

/// One configuration layer. Every field is optional so layers can be merged.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSettings {
    pub hostname: Option<String>,
    pub api_key: Option<String>,
    pub debug: Option<bool>,
    pub verify_ssl: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub output_format: Option<String>,
    pub cache_target_kind: Option<bool>,
    pub listen_addr: Option<String>,
}

impl PartialSettings {
    /// Load a TOML file. Keys are the variable names in snake_case without
    /// the `PANOS_` prefix.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `PANOS_*` variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &'static str| var(key).map(|v| parse_bool(key, &v)).transpose();

        Ok(Self {
            hostname: var(HOSTNAME_VAR),
            api_key: var(API_KEY_VAR),
            debug: flag("PANOS_DEBUG")?,
            verify_ssl: flag("PANOS_VERIFY_SSL")?,
            timeout_secs: var("PANOS_TIMEOUT_SECS")
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|e| {
                        ConfigError::Invalid {
                            key: "PANOS_TIMEOUT_SECS",
                            value: v.clone(),
                            reason: e.to_string(),
                        }
                    })
                })
                .transpose()?,
            output_format: var("PANOS_OUTPUT_FORMAT"),
            cache_target_kind: flag("PANOS_CACHE_TARGET_KIND")?,
            listen_addr: var("PANOS_LISTEN_ADDR"),
        })
    }

    /// Layer `other` on top of `self`.
    pub fn merge(self, other: Self) -> Self {
        Self {
            hostname: other.hostname.or(self.hostname),
            api_key: other.api_key.or(self.api_key),
            debug: other.debug.or(self.debug),
            verify_ssl: other.verify_ssl.or(self.verify_ssl),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            output_format: other.output_format.or(self.output_format),
            cache_target_kind: other.cache_target_kind.or(self.cache_target_kind),
            listen_addr: other.listen_addr.or(self.listen_addr),
        }
    }

    /// Apply defaults and check required values.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let hostname = self.hostname.filter(|v| !v.trim().is_empty());
        let api_key = self.api_key.filter(|v| !v.is_empty());

        let (hostname, api_key) = match (hostname, api_key) {
            (Some(hostname), Some(api_key)) => (hostname, api_key),
            (hostname, api_key) => {
                let mut missing = Vec::new();
                if hostname.is_none() {
                    missing.push(HOSTNAME_VAR);
                }
                if api_key.is_none() {
                    missing.push(API_KEY_VAR);
                }
                return Err(ConfigError::Missing(missing));
            }
        };

        let output_format = match self.output_format {
            Some(raw) => raw.parse::<OutputFormat>().map_err(|reason| ConfigError::Invalid {
                key: "output_format",
                value: raw,
                reason,
            })?,
            None => OutputFormat::default(),
        };

        let listen_addr = self
            .listen_addr
            .as_deref()
            .unwrap_or(DEFAULT_LISTEN_ADDR);
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "listen_addr",
                value: listen_addr.to_string(),
                reason: e.to_string(),
            })?;

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(Settings {
            hostname,
            api_key: SecretString::from(api_key),
            debug: self.debug.unwrap_or(false),
            verify_ssl: self.verify_ssl.unwrap_or(true),
            timeout: Duration::from_secs(timeout_secs),
            output_format,
            cache_target_kind: self.cache_target_kind.unwrap_or(false),
            listen_addr,
        })
    }
}

impl Settings {
    /// Resolve settings from an optional file, the environment lookup and
    /// command-line overrides.
    pub fn load<F>(
        file: Option<&Path>,
        lookup: F,
        overrides: PartialSettings,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match file {
            Some(path) => PartialSettings::from_file(path)?,
            None => PartialSettings::default(),
        };
        base.merge(PartialSettings::from_lookup(lookup)?)
            .merge(overrides)
            .resolve()
    }

    pub fn from_env(file: Option<&Path>, overrides: PartialSettings) -> Result<Self, ConfigError> {
        Self::load(file, |key| std::env::var(key).ok(), overrides)
    }
}

/// `true/1/yes/y/on` and `false/0/no/n/off`, case-insensitive.
pub fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "0" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
