//! Bounded, most-recent-first log of lifecycle and tracking events.
//!
//! The log is display-oriented: entries are immutable once recorded, the
//! newest entry sits at the front, and the oldest entry is evicted silently
//! once the log holds [`EVENT_LOG_CAPACITY`] entries.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Maximum number of entries retained.
pub const EVENT_LOG_CAPACITY: usize = 50;

/// Key/value payload attached to an entry.
pub type EventPayload = Map<String, Value>;

/// Tag describing what an entry records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    InitStarted,
    InitSuccess,
    InitError,
    UpdateError,
    Teardown,
    WalletConnected,
    WalletDisconnecting,
    NetworkUpdated,
    EventTracked,
    /// Consumer-supplied kind such as `TRANSACTION_CONFIRMED`.
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InitStarted => "INIT_STARTED",
            Self::InitSuccess => "INIT_SUCCESS",
            Self::InitError => "INIT_ERROR",
            Self::UpdateError => "UPDATE_ERROR",
            Self::Teardown => "TEARDOWN",
            Self::WalletConnected => "WALLET_CONNECTED",
            Self::WalletDisconnecting => "WALLET_DISCONNECTING",
            Self::NetworkUpdated => "NETWORK_UPDATED",
            Self::EventTracked => "EVENT_TRACKED",
            Self::Custom(kind) => kind,
        }
    }

    /// Display tone, derived from the tag text so custom kinds classify too.
    pub fn tone(&self) -> EventTone {
        EventTone::classify(self.as_str())
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "INIT_STARTED" => Self::InitStarted,
            "INIT_SUCCESS" => Self::InitSuccess,
            "INIT_ERROR" => Self::InitError,
            "UPDATE_ERROR" => Self::UpdateError,
            "TEARDOWN" => Self::Teardown,
            "WALLET_CONNECTED" => Self::WalletConnected,
            "WALLET_DISCONNECTING" => Self::WalletDisconnecting,
            "NETWORK_UPDATED" => Self::NetworkUpdated,
            "EVENT_TRACKED" => Self::EventTracked,
            _ => Self::Custom(normalized),
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse severity used when rendering the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTone {
    Error,
    Success,
    Pending,
    Broadcast,
    Init,
    Wallet,
    Neutral,
}

impl EventTone {
    /// First matching rule wins, so `INIT_ERROR` is an error, not an init.
    pub fn classify(kind: &str) -> Self {
        let has = |needle: &str| kind.contains(needle);
        if has("ERROR") || has("REVERTED") {
            Self::Error
        } else if has("SUCCESS") || has("CONFIRMED") {
            Self::Success
        } else if has("STARTED") || has("REQUESTED") {
            Self::Pending
        } else if has("BROADCASTED") {
            Self::Broadcast
        } else if has("INIT") {
            Self::Init
        } else if has("WALLET") {
            Self::Wallet
        } else {
            Self::Neutral
        }
    }

    /// ANSI color used by the terminal front-end.
    pub fn ansi_color(self) -> &'static str {
        match self {
            Self::Error => "\x1b[31m",
            Self::Success => "\x1b[32m",
            Self::Pending => "\x1b[33m",
            Self::Broadcast => "\x1b[34m",
            Self::Init => "\x1b[35m",
            Self::Wallet => "\x1b[36m",
            Self::Neutral => "\x1b[90m",
        }
    }
}

/// One immutable log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub payload: EventPayload,
}

impl EventLogEntry {
    fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }
}

/// Fixed-capacity ring buffer of [`EventLogEntry`] values.
///
/// Interior mutability lets the controller worker and UI consumers share
/// one log behind an `Arc`. The lock is never held across an await.
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<VecDeque<EventLogEntry>>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a new entry at the front, evicting from the back when full.
    pub fn record(&self, kind: impl Into<EventKind>, payload: EventPayload) -> EventLogEntry {
        let entry = EventLogEntry::new(kind.into(), payload);
        let mut entries = self.lock();
        entries.push_front(entry.clone());
        entries.truncate(self.capacity);
        entry
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot of the log, most recent first.
    pub fn entries(&self) -> Vec<EventLogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of retained entries carrying `kind`.
    pub fn count_of(&self, kind: &EventKind) -> usize {
        self.lock().iter().filter(|e| &e.kind == kind).count()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<EventLogEntry>> {
        // A poisoned log still holds valid entries; keep serving them.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build an [`EventPayload`] from `key => value` pairs.
#[macro_export]
macro_rules! payload {
    () => { $crate::event_log::EventPayload::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::event_log::EventPayload::new();
        $( map.insert($key.to_string(), ::serde_json::json!($value)); )+
        map
    }};
}
