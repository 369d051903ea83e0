//! User settings persisted to disk.
//!
//! Stored in `~/.formo-sync/config.toml`. Env vars override every value
//! here; see [`crate::config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings file contents. Every field is optional so partial files work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Formo write key.
    #[serde(default)]
    pub write_key: Option<String>,

    /// Default network: `devnet`, `testnet`, or `mainnet-beta`.
    #[serde(default, alias = "cluster")]
    pub network: Option<String>,

    /// Custom RPC endpoint for the default network.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Connect a demo wallet when the REPL starts.
    #[serde(default)]
    pub auto_connect: Option<bool>,
}

impl Settings {
    /// `~/.formo-sync/config.toml`.
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::formo_home().join("config.toml")
    }

    /// Load a TOML settings file. A missing file is `Ok(None)`.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::ParseError(format!("invalid TOML in {}: {e}", path.display())))
    }

    /// Overlay values present in `other`.
    pub fn merge_from(&mut self, other: &Settings) {
        if other.write_key.is_some() {
            self.write_key = other.write_key.clone();
        }
        if other.network.is_some() {
            self.network = other.network.clone();
        }
        if other.rpc_url.is_some() {
            self.rpc_url = other.rpc_url.clone();
        }
        if other.auto_connect.is_some() {
            self.auto_connect = other.auto_connect;
        }
    }
}
