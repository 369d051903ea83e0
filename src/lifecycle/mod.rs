//! Analytics client lifecycle controller.
//!
//! Keeps exactly one live analytics instance consistent with the latest
//! credential, network selection and wallet snapshot:
//!
//! ```text
//! Uninitialized ──► Initializing ──► Ready ──► TornDown
//!                        │             ▲ │
//!                        ▼             │ └── update-in-place (set_wallet / set_network)
//!                      Failed ─────────┘     or teardown + re-init
//! ```
//!
//! A single worker task owns the instance and is the only writer of
//! [`LifecycleState`]. Inputs arrive through watch channels, so bursts of
//! notifications coalesce and only actual value changes cause transitions.
//! Dropping the controller (or calling [`AnalyticsController::shutdown`])
//! disposes it; an instance whose `init` resolves after disposal is cleaned
//! up and never published.

mod wallet_events;
mod worker;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::analytics::{AnalyticsFactory, AnalyticsHandle};
use crate::config::WriteKey;
use crate::error::{LifecycleError, TrackError};
use crate::event_log::{EventKind, EventLog, EventLogEntry, EventPayload};
use crate::network::{EndpointResolver, Network};
use crate::payload;
use crate::wallet::WalletSubscription;

use self::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    TornDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::TornDown => "torn_down",
        };
        f.write_str(label)
    }
}

/// Published controller state.
///
/// Constructors keep the combinations coherent: an instance is present
/// only while ready, and a ready state never carries an error.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleState {
    phase: Phase,
    network: Network,
    instance: Option<AnalyticsHandle>,
    error: Option<LifecycleError>,
}

impl LifecycleState {
    pub(crate) fn uninitialized(network: Network) -> Self {
        Self {
            phase: Phase::Uninitialized,
            network,
            instance: None,
            error: None,
        }
    }

    pub(crate) fn initializing(network: Network) -> Self {
        Self {
            phase: Phase::Initializing,
            ..Self::uninitialized(network)
        }
    }

    pub(crate) fn ready(instance: AnalyticsHandle, network: Network) -> Self {
        Self {
            phase: Phase::Ready,
            network,
            instance: Some(instance),
            error: None,
        }
    }

    pub(crate) fn failed(error: LifecycleError, network: Network) -> Self {
        Self {
            phase: Phase::Failed,
            network,
            instance: None,
            error: Some(error),
        }
    }

    pub(crate) fn torn_down(network: Network) -> Self {
        Self {
            phase: Phase::TornDown,
            ..Self::uninitialized(network)
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Network the instance was created for or last updated to.
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn instance(&self) -> Option<&AnalyticsHandle> {
        self.instance.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn error(&self) -> Option<&LifecycleError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> StatusIndicator {
        match (&self.error, self.phase) {
            (Some(error), _) => StatusIndicator::Error(error.to_string()),
            (None, Phase::Ready) => StatusIndicator::Active,
            (None, Phase::TornDown) => StatusIndicator::Stopped,
            (None, _) => StatusIndicator::Initializing,
        }
    }
}

/// Persistent status shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusIndicator {
    Initializing,
    Active,
    Error(String),
    Stopped,
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("initializing"),
            Self::Active => f.write_str("active"),
            Self::Error(message) => write!(f, "error: {message}"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Inputs a controller reacts to.
pub struct ControllerInputs {
    pub write_key: Option<WriteKey>,
    pub endpoints: EndpointResolver,
    pub network: watch::Receiver<Network>,
    pub wallet: WalletSubscription,
    pub event_log: Arc<EventLog>,
}

/// Owner of the analytics instance lifecycle.
///
/// Must be created inside a Tokio runtime.
pub struct AnalyticsController {
    state: watch::Receiver<LifecycleState>,
    event_log: Arc<EventLog>,
    credential: watch::Sender<Option<WriteKey>>,
    flush: mpsc::UnboundedSender<oneshot::Sender<()>>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl AnalyticsController {
    pub fn spawn(factory: Arc<dyn AnalyticsFactory>, inputs: ControllerInputs) -> Self {
        let initial_network = *inputs.network.borrow();
        let (state_tx, state_rx) = watch::channel(LifecycleState::uninitialized(initial_network));
        let (credential_tx, credential_rx) = watch::channel(inputs.write_key);
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tracing::debug!(
            factory = factory.name(),
            support = ?factory.update_support(),
            network = %initial_network,
            "spawning analytics lifecycle controller"
        );

        let worker = Worker::new(
            factory,
            inputs.endpoints,
            credential_rx,
            inputs.network,
            inputs.wallet,
            flush_rx,
            shutdown_rx,
            state_tx,
            Arc::clone(&inputs.event_log),
        );

        Self {
            state: state_rx,
            event_log: inputs.event_log,
            credential: credential_tx,
            flush: flush_tx,
            shutdown: shutdown_tx,
            worker: Some(tokio::spawn(worker.run())),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.clone()
    }

    pub fn instance(&self) -> Option<AnalyticsHandle> {
        self.state.borrow().instance.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().is_ready()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.as_ref().map(ToString::to_string)
    }

    pub fn status(&self) -> StatusIndicator {
        self.state.borrow().status()
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.event_log
    }

    pub fn event_log_entries(&self) -> Vec<EventLogEntry> {
        self.event_log.entries()
    }

    pub fn record_event(&self, kind: impl Into<EventKind>, payload: EventPayload) -> EventLogEntry {
        self.event_log.record(kind, payload)
    }

    pub fn clear_event_log(&self) {
        self.event_log.clear();
    }

    /// Report an event through the live instance.
    ///
    /// Failures are returned to the caller and leave the lifecycle untouched.
    pub async fn track(&self, event: &str, properties: EventPayload) -> Result<(), TrackError> {
        let handle = self.instance().ok_or(TrackError::NotInitialized)?;
        if let Err(e) = handle.track(event, &properties).await {
            tracing::warn!(event, error = %e, "failed to track event");
            return Err(e);
        }
        self.event_log.record(
            EventKind::EventTracked,
            payload!("event" => event.trim(), "properties" => properties),
        );
        Ok(())
    }

    /// Replace the write credential. Returns whether it changed.
    pub fn set_write_key(&self, write_key: Option<WriteKey>) -> bool {
        self.credential.send_if_modified(|current| {
            if *current == write_key {
                false
            } else {
                *current = write_key;
                true
            }
        })
    }

    /// Wait until every input change published before this call has been
    /// reconciled, including any create it triggered.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.flush.send(ack_tx).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Dispose the controller and wait for the instance to be cleaned up.
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            tracing::error!("analytics lifecycle worker panicked: {}", e);
        }
    }
}

impl Drop for AnalyticsController {
    fn drop(&mut self) {
        // The worker finishes any in-flight create and cleans up on its own.
        self.shutdown.send_replace(true);
    }
}

impl fmt::Debug for AnalyticsController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsController")
            .field("state", &*self.state.borrow())
            .field("event_log_len", &self.event_log.len())
            .finish()
    }
}
