//! Network (cluster) selection shared across the process.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Closed set of networks the analytics client may report against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Network {
    pub const ALL: [Network; 3] = [Self::Devnet, Self::Testnet, Self::MainnetBeta];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::MainnetBeta => "mainnet-beta",
        }
    }

    /// Public RPC endpoint for the network.
    pub fn cluster_api_url(self) -> &'static str {
        match self {
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }

    /// Parse a candidate, returning `None` for anything outside the allowed set.
    pub fn parse(candidate: &str) -> Option<Self> {
        match candidate.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "devnet" => Some(Self::Devnet),
            "testnet" => Some(Self::Testnet),
            "mainnet" | "mainnet-beta" => Some(Self::MainnetBeta),
            _ => None,
        }
    }

    /// Parse an optional external value, falling back to the default.
    pub fn parse_or_default(candidate: Option<&str>) -> Self {
        candidate.and_then(Self::parse).unwrap_or_default()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("expected 'devnet', 'testnet', or 'mainnet-beta', got '{s}'")
        })
    }
}

/// Picks the RPC endpoint for the active network.
///
/// A custom endpoint only applies while the active network is the configured
/// default; switching away falls back to the public endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    default_network: Network,
    custom_endpoint: Option<String>,
}

impl EndpointResolver {
    pub fn new(default_network: Network, custom_endpoint: Option<String>) -> Self {
        Self {
            default_network,
            custom_endpoint,
        }
    }

    pub fn endpoint_for(&self, network: Network) -> String {
        match &self.custom_endpoint {
            Some(custom) if network == self.default_network => custom.clone(),
            _ => network.cluster_api_url().to_string(),
        }
    }
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new(Network::default(), None)
    }
}

/// Current network selection, observable through a watch channel.
///
/// Setting the value that is already selected does not notify subscribers.
#[derive(Debug)]
pub struct NetworkSelection {
    tx: watch::Sender<Network>,
}

impl NetworkSelection {
    pub fn new(initial: Network) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Network {
        *self.tx.borrow()
    }

    /// Select `candidate` if it names an allowed network.
    ///
    /// Invalid candidates leave the selection untouched and return `false`.
    pub fn set(&self, candidate: &str) -> bool {
        match Network::parse(candidate) {
            Some(network) => {
                self.select(network);
                true
            }
            None => {
                tracing::debug!(candidate, "ignoring invalid network selection");
                false
            }
        }
    }

    /// Select a network, returning whether the selection changed.
    pub fn select(&self, network: Network) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == network {
                false
            } else {
                *current = network;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Network> {
        self.tx.subscribe()
    }
}

impl Default for NetworkSelection {
    fn default() -> Self {
        Self::new(Network::default())
    }
}
