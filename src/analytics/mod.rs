//! Seams to the external analytics client.
//!
//! The lifecycle controller never talks to a concrete SDK. It drives an
//! [`AnalyticsFactory`] that creates [`AnalyticsInstance`] values and hands
//! consumers an [`AnalyticsHandle`] that can only report events.

mod console;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::WriteKey;
use crate::error::{ClientError, TrackError};
use crate::event_log::EventPayload;
use crate::network::Network;
use crate::wallet::WalletSnapshot;

pub use self::console::ConsoleAnalytics;

/// Whether live instances accept wallet/network changes without a rebuild.
///
/// Resolved once per factory when a controller starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSupport {
    /// `set_wallet` and `set_network` reconfigure the live instance.
    InPlace,
    /// Any input change requires teardown and a fresh `init`.
    Reinit,
}

/// Everything `init` needs besides the write key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub network: Network,
    pub endpoint: String,
    pub wallet: WalletSnapshot,
}

/// Creates analytics instances.
#[async_trait]
pub trait AnalyticsFactory: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn update_support(&self) -> UpdateSupport;

    async fn init(
        &self,
        write_key: &WriteKey,
        options: InitOptions,
    ) -> Result<Box<dyn AnalyticsInstance>, ClientError>;
}

/// A live analytics client.
///
/// Only the lifecycle controller calls the reconfiguration and cleanup
/// methods; consumers go through [`AnalyticsHandle::track`].
#[async_trait]
pub trait AnalyticsInstance: Send + Sync {
    async fn track(&self, event: &str, properties: &EventPayload) -> Result<(), ClientError>;

    async fn set_wallet(&self, _wallet: &WalletSnapshot) -> Result<(), ClientError> {
        Err(ClientError::Unsupported("set_wallet"))
    }

    async fn set_network(&self, _network: Network, _endpoint: &str) -> Result<(), ClientError> {
        Err(ClientError::Unsupported("set_network"))
    }

    /// Release the instance. Called exactly once per instance.
    async fn cleanup(&self);
}

/// Consumer-facing view of the live instance.
///
/// Cloning is cheap. Once the controller tears the instance down the handle
/// is retired and every `track` call fails with [`TrackError::Retired`].
#[derive(Clone)]
pub struct AnalyticsHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    generation: u64,
    instance: Arc<dyn AnalyticsInstance>,
    retired: AtomicBool,
}

impl AnalyticsHandle {
    pub(crate) fn new(generation: u64, instance: Box<dyn AnalyticsInstance>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                generation,
                instance: Arc::from(instance),
                retired: AtomicBool::new(false),
            }),
        }
    }

    /// Monotonic counter distinguishing successive instances of one controller.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::Acquire)
    }

    pub async fn track(&self, event: &str, properties: &EventPayload) -> Result<(), TrackError> {
        if self.is_retired() {
            return Err(TrackError::Retired);
        }
        let event = event.trim();
        if event.is_empty() {
            return Err(TrackError::InvalidEventName);
        }
        self.inner.instance.track(event, properties).await?;
        Ok(())
    }

    pub(crate) fn instance(&self) -> Arc<dyn AnalyticsInstance> {
        Arc::clone(&self.inner.instance)
    }

    pub(crate) fn retire(&self) {
        self.inner.retired.store(true, Ordering::Release);
    }
}

impl PartialEq for AnalyticsHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for AnalyticsHandle {}

impl fmt::Debug for AnalyticsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsHandle")
            .field("generation", &self.generation())
            .field("retired", &self.is_retired())
            .finish()
    }
}

/// Parse user-supplied event properties. Only JSON objects are accepted.
pub fn parse_properties(raw: &str) -> Result<EventPayload, TrackError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(EventPayload::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(TrackError::InvalidProperties),
    }
}

/// Events offered by the terminal front-end without typing properties.
pub fn preset_event(name: &str) -> Option<EventPayload> {
    match name {
        "button_click" => Some(crate::payload!(
            "button_id" => "cta_hero",
            "page" => "home",
        )),
        "feature_used" => Some(crate::payload!(
            "feature" => "swap",
            "token_in" => "SOL",
            "token_out" => "USDC",
        )),
        _ => None,
    }
}

pub const PRESET_EVENTS: &[&str] = &["button_click", "feature_used"];
