//! Configuration for formo-sync.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! Env files are loaded first (see [`crate::bootstrap`]). Values are read
//! once at startup.

pub(crate) mod helpers;

use std::fmt;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::network::{EndpointResolver, Network};
use crate::settings::Settings;

/// Env var holding the Formo write key.
pub const WRITE_KEY_ENV: &str = "FORMO_WRITE_KEY";

/// Value shipped in example env files; treated as absent.
pub const WRITE_KEY_PLACEHOLDER: &str = "your_write_key_here";

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub network: NetworkConfig,
    pub repl: ReplConfig,
}

/// Write credential for the analytics client.
///
/// Equality compares a blake3 fingerprint so the controller can detect
/// credential changes without keeping a second plaintext copy around.
#[derive(Clone)]
pub struct WriteKey {
    secret: SecretString,
    fingerprint: blake3::Hash,
}

impl WriteKey {
    /// Returns `None` for blank values and the placeholder.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == WRITE_KEY_PLACEHOLDER {
            return None;
        }
        Some(Self {
            secret: SecretString::from(raw.to_string()),
            fingerprint: blake3::hash(raw.as_bytes()),
        })
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Short hex prefix of the fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        self.fingerprint.to_hex()[..8].to_string()
    }
}

impl PartialEq for WriteKey {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for WriteKey {}

impl fmt::Debug for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WriteKey({})", self.fingerprint())
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// `None` when unset or left at the placeholder.
    pub write_key: Option<WriteKey>,
}

impl AnalyticsConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw = helpers::first_non_empty_env(&[WRITE_KEY_ENV, "NEXT_PUBLIC_FORMO_WRITE_KEY"])?
            .or_else(|| settings.write_key.clone());
        let write_key = raw.as_deref().and_then(WriteKey::parse);
        if write_key.is_none() {
            tracing::warn!("{WRITE_KEY_ENV} is not set; analytics will stay disabled");
        }
        Ok(Self { write_key })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub default_network: Network,
    pub custom_rpc_url: Option<String>,
}

impl NetworkConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw = helpers::first_non_empty_env(&["SOLANA_CLUSTER", "NEXT_PUBLIC_SOLANA_CLUSTER"])?
            .or_else(|| settings.network.clone());
        let default_network = match raw.as_deref() {
            Some(value) => Network::parse(value).unwrap_or_else(|| {
                tracing::warn!(
                    value,
                    "unknown network; falling back to {}",
                    Network::default()
                );
                Network::default()
            }),
            None => Network::default(),
        };

        let custom_rpc_url =
            helpers::first_non_empty_env(&["SOLANA_RPC_URL", "NEXT_PUBLIC_SOLANA_RPC_URL"])?
                .or_else(|| settings.rpc_url.clone())
                .map(|raw| validate_endpoint("SOLANA_RPC_URL", &raw))
                .transpose()?;

        Ok(Self {
            default_network,
            custom_rpc_url,
        })
    }

    pub fn endpoints(&self) -> EndpointResolver {
        EndpointResolver::new(self.default_network, self.custom_rpc_url.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplConfig {
    pub auto_connect: bool,
}

impl ReplConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let auto_connect = match helpers::optional_env("FORMO_AUTO_CONNECT")? {
            Some(value) => helpers::parse_bool("FORMO_AUTO_CONNECT", &value)?,
            None => settings.auto_connect.unwrap_or(false),
        };
        Ok(Self { auto_connect })
    }
}

fn validate_endpoint(key: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("must be an absolute URL: {e}"),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim().to_string()),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{other}', expected http or https"),
        }),
    }
}

impl Config {
    /// Load configuration from env vars and the default TOML file.
    ///
    /// Env files are not read here; the binary loads them once at startup
    /// with [`crate::bootstrap::load_env_files`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load with an optional explicit TOML config file.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        Self::apply_toml_overlay(&mut settings, toml_path)?;
        Self::build(&settings)
    }

    /// Load and merge a TOML config file into settings.
    ///
    /// If `explicit_path` is `Some`, a missing or broken file is fatal.
    /// Otherwise `~/.formo-sync/config.toml` is tried and problems are
    /// only logged.
    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(e);
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }

    /// Build config from settings, letting env vars win.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            analytics: AnalyticsConfig::resolve(settings)?,
            network: NetworkConfig::resolve(settings)?,
            repl: ReplConfig::resolve(settings)?,
        })
    }
}
