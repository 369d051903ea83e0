//! Read-only view of the wallet adapter's connection state.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

/// Signing operations a connected wallet advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningCapability {
    SignMessage,
    SignTransaction,
    SignAllTransactions,
}

/// Point-in-time read of the wallet adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub connected: bool,
    pub public_key: Option<String>,
    pub disconnecting: bool,
    pub wallet_name: Option<String>,
    #[serde(default)]
    pub capabilities: BTreeSet<SigningCapability>,
}

impl WalletSnapshot {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A connected wallet advertising every signing capability.
    pub fn connected(public_key: impl Into<String>, wallet_name: Option<String>) -> Self {
        Self {
            connected: true,
            public_key: Some(public_key.into()),
            disconnecting: false,
            wallet_name,
            capabilities: BTreeSet::from([
                SigningCapability::SignMessage,
                SigningCapability::SignTransaction,
                SigningCapability::SignAllTransactions,
            ]),
        }
    }

    /// The intermediate state the adapter reports while tearing down a session.
    pub fn disconnecting(&self) -> Self {
        Self {
            connected: false,
            disconnecting: true,
            ..self.clone()
        }
    }

    /// Address of a connected wallet; `None` while disconnected.
    pub fn address(&self) -> Option<&str> {
        if self.connected {
            self.public_key.as_deref()
        } else {
            None
        }
    }

    pub fn identity(&self) -> WalletIdentity {
        WalletIdentity {
            connected: self.connected,
            public_key: self.address().map(str::to_string),
        }
    }

    /// `ABCDEFGH...STUVWXYZ` form used in status lines.
    pub fn short_address(&self) -> Option<String> {
        self.address().map(shorten_address)
    }
}

/// The part of a snapshot that decides whether the analytics instance must
/// learn about a wallet change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WalletIdentity {
    pub connected: bool,
    pub public_key: Option<String>,
}

pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}...{tail}")
}

/// Publishes wallet adapter notifications to the lifecycle controller.
///
/// Subscribers see both the latest snapshot and every notification in
/// publish order, so transient states such as `disconnecting` are never
/// lost to coalescing. Redundant notifications are still delivered; the
/// controller ignores them.
#[derive(Debug)]
pub struct WalletFeed {
    tx: watch::Sender<WalletSnapshot>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<WalletSnapshot>>>,
}

impl WalletFeed {
    pub fn new(initial: WalletSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn publish(&self, snapshot: WalletSnapshot) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| listener.send(snapshot.clone()).is_ok());
        // Queue first: a woken subscriber must find the notification waiting.
        self.tx.send_replace(snapshot);
    }

    pub fn current(&self) -> WalletSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to the feed. The notification queue starts with the
    /// snapshot current at subscription time.
    pub fn subscribe(&self) -> WalletSubscription {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let (tx, notifications) = mpsc::unbounded_channel();
        let latest = self.tx.subscribe();
        let _ = tx.send(latest.borrow().clone());
        listeners.push(tx);
        WalletSubscription {
            latest,
            notifications,
        }
    }
}

impl Default for WalletFeed {
    fn default() -> Self {
        Self::new(WalletSnapshot::disconnected())
    }
}

/// One subscriber's view of a [`WalletFeed`].
#[derive(Debug)]
pub struct WalletSubscription {
    pub(crate) latest: watch::Receiver<WalletSnapshot>,
    pub(crate) notifications: mpsc::UnboundedReceiver<WalletSnapshot>,
}

impl WalletSubscription {
    pub fn latest(&self) -> WalletSnapshot {
        self.latest.borrow().clone()
    }

    /// Next queued notification, if one is waiting.
    pub fn try_next(&mut self) -> Option<WalletSnapshot> {
        self.notifications.try_recv().ok()
    }
}
