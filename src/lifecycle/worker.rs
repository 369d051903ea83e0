use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::LifecycleState;
use super::wallet_events::WalletEventTracker;
use crate::analytics::{AnalyticsFactory, AnalyticsHandle, InitOptions, UpdateSupport};
use crate::config::{WRITE_KEY_ENV, WriteKey};
use crate::error::{ClientError, LifecycleError};
use crate::event_log::{EventKind, EventLog};
use crate::network::{EndpointResolver, Network};
use crate::payload;
use crate::wallet::{WalletIdentity, WalletSnapshot, WalletSubscription};

/// The input tuple an instance is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Inputs {
    credential: Option<WriteKey>,
    network: Network,
    wallet: WalletIdentity,
}

struct LiveInstance {
    handle: AnalyticsHandle,
    inputs: Inputs,
}

enum Step {
    /// Live instance (or recorded failure) matches the inputs.
    Settled,
    /// Something changed while awaiting; reconcile again.
    Again,
    Shutdown,
}

pub(super) struct Worker {
    factory: Arc<dyn AnalyticsFactory>,
    support: UpdateSupport,
    endpoints: EndpointResolver,

    credential: watch::Receiver<Option<WriteKey>>,
    network: watch::Receiver<Network>,
    wallet: watch::Receiver<WalletSnapshot>,
    wallet_notifications: mpsc::UnboundedReceiver<WalletSnapshot>,
    credential_open: bool,
    network_open: bool,
    wallet_open: bool,
    flush: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
    shutdown: watch::Receiver<bool>,

    state: watch::Sender<LifecycleState>,
    log: Arc<EventLog>,

    live: Option<LiveInstance>,
    last_attempt: Option<Inputs>,
    latest_wallet: WalletSnapshot,
    wallet_events: WalletEventTracker,
    generation: u64,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        factory: Arc<dyn AnalyticsFactory>,
        endpoints: EndpointResolver,
        credential: watch::Receiver<Option<WriteKey>>,
        network: watch::Receiver<Network>,
        wallet: WalletSubscription,
        flush: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
        shutdown: watch::Receiver<bool>,
        state: watch::Sender<LifecycleState>,
        log: Arc<EventLog>,
    ) -> Self {
        let support = factory.update_support();
        Self {
            factory,
            support,
            endpoints,
            credential,
            network,
            wallet: wallet.latest,
            wallet_notifications: wallet.notifications,
            credential_open: true,
            network_open: true,
            wallet_open: true,
            flush,
            shutdown,
            state,
            log,
            live: None,
            last_attempt: None,
            latest_wallet: WalletSnapshot::disconnected(),
            wallet_events: WalletEventTracker::default(),
            generation: 0,
        }
    }

    pub(super) async fn run(mut self) {
        loop {
            if self.shutting_down() {
                break;
            }

            match self.reconcile().await {
                Step::Shutdown => break,
                Step::Again => {
                    self.observe_wallet();
                    continue;
                }
                Step::Settled => self.observe_wallet(),
            }

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => {}
                changed = self.credential.changed(), if self.credential_open => {
                    if changed.is_err() {
                        self.credential_open = false;
                    }
                }
                changed = self.network.changed(), if self.network_open => {
                    if changed.is_err() {
                        self.network_open = false;
                    }
                }
                changed = self.wallet.changed(), if self.wallet_open => {
                    if changed.is_err() {
                        self.wallet_open = false;
                    }
                }
                Some(ack) = self.flush.recv() => {
                    let _ = ack.send(());
                }
            }
        }

        self.dispose().await;
    }

    fn shutting_down(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Read the latest inputs and mark them seen.
    fn take_inputs(&mut self) -> Inputs {
        self.latest_wallet = self.wallet.borrow_and_update().clone();
        Inputs {
            credential: self.credential.borrow_and_update().clone(),
            network: *self.network.borrow_and_update(),
            wallet: self.latest_wallet.identity(),
        }
    }

    /// Latest inputs without marking them seen.
    fn peek_inputs(&self) -> Inputs {
        Inputs {
            credential: self.credential.borrow().clone(),
            network: *self.network.borrow(),
            wallet: self.wallet.borrow().identity(),
        }
    }

    fn publish(&self, next: LifecycleState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Log connect and disconnect transitions in the order they were published.
    fn observe_wallet(&mut self) {
        let announce = self.live.is_some();
        let mut events = Vec::new();
        while let Ok(snapshot) = self.wallet_notifications.try_recv() {
            events.extend(self.wallet_events.observe(&snapshot, announce));
        }
        if announce {
            events.extend(self.wallet_events.announce_pending());
        }
        for (kind, payload) in events {
            self.log.record(kind, payload);
        }
    }

    async fn reconcile(&mut self) -> Step {
        let desired = self.take_inputs();

        if desired.credential.is_none() {
            return self.missing_credential(desired).await;
        }

        let Some(live_inputs) = self.live.as_ref().map(|live| live.inputs.clone()) else {
            // Failed or superseded attempts are not retried for the same inputs.
            if self.last_attempt.as_ref() == Some(&desired) {
                return Step::Settled;
            }
            return self.create(desired).await;
        };

        if live_inputs == desired {
            return Step::Settled;
        }

        if live_inputs.credential != desired.credential || self.support == UpdateSupport::Reinit {
            let reason = if live_inputs.credential != desired.credential {
                "credential_changed"
            } else {
                "inputs_changed"
            };
            self.teardown(reason).await;
            return self.create(desired).await;
        }

        self.update_in_place(live_inputs, desired).await
    }

    async fn missing_credential(&mut self, desired: Inputs) -> Step {
        if self.live.is_some() {
            self.teardown("credential_removed").await;
        }

        let error = LifecycleError::MissingCredential { key: WRITE_KEY_ENV };
        let already_reported = self
            .state
            .borrow()
            .error()
            .is_some_and(LifecycleError::is_terminal);
        if !already_reported {
            tracing::error!("Analytics disabled: {}", error);
            self.log.record(
                EventKind::InitError,
                payload!("error" => error.to_string(), "code" => error.code()),
            );
        }

        self.publish(LifecycleState::failed(error, desired.network));
        self.last_attempt = Some(desired);
        Step::Settled
    }

    async fn create(&mut self, desired: Inputs) -> Step {
        let Some(write_key) = desired.credential.clone() else {
            return Step::Again;
        };
        self.last_attempt = Some(desired.clone());

        let network = desired.network;
        let endpoint = self.endpoints.endpoint_for(network);
        let wallet = self.latest_wallet.clone();

        self.publish(LifecycleState::initializing(network));
        self.log.record(
            EventKind::InitStarted,
            payload!(
                "cluster" => network.as_str(),
                "endpoint" => endpoint.as_str(),
                "hasWallet" => wallet.public_key.is_some(),
                "walletConnected" => wallet.connected,
            ),
        );
        tracing::info!(
            factory = self.factory.name(),
            key = %write_key.fingerprint(),
            %network,
            %endpoint,
            "initializing analytics client"
        );

        let options = InitOptions {
            network,
            endpoint,
            wallet: wallet.clone(),
        };

        match self.factory.init(&write_key, options).await {
            Ok(instance) => {
                self.generation += 1;
                let handle = AnalyticsHandle::new(self.generation, instance);

                if self.shutting_down() {
                    handle.retire();
                    handle.instance().cleanup().await;
                    tracing::debug!(
                        generation = handle.generation(),
                        "discarded analytics instance created after disposal"
                    );
                    return Step::Shutdown;
                }

                if self.is_stale(&desired) {
                    handle.retire();
                    handle.instance().cleanup().await;
                    self.publish(LifecycleState::uninitialized(network));
                    self.log.record(
                        EventKind::Teardown,
                        payload!("cluster" => network.as_str(), "reason" => "superseded"),
                    );
                    tracing::debug!(
                        generation = handle.generation(),
                        "inputs changed during init; discarded analytics instance"
                    );
                    return Step::Again;
                }

                self.publish(LifecycleState::ready(handle.clone(), network));
                self.log.record(
                    EventKind::InitSuccess,
                    payload!(
                        "cluster" => network.as_str(),
                        "walletConnected" => wallet.connected,
                        "walletAddress" => wallet.address(),
                    ),
                );
                tracing::info!(
                    generation = handle.generation(),
                    %network,
                    "analytics client ready"
                );
                self.live = Some(LiveInstance {
                    handle,
                    inputs: desired,
                });
                Step::Again
            }
            Err(source) => {
                if self.shutting_down() {
                    return Step::Shutdown;
                }
                let error = LifecycleError::Initialization(source);
                tracing::error!("Failed to initialize analytics client: {}", error);
                self.log.record(
                    EventKind::InitError,
                    payload!("error" => error.to_string(), "code" => error.code()),
                );
                self.publish(LifecycleState::failed(error, network));
                Step::Again
            }
        }
    }

    /// Whether an instance built for `attempted` no longer fits the inputs.
    fn is_stale(&self, attempted: &Inputs) -> bool {
        let current = self.peek_inputs();
        if current.credential != attempted.credential {
            return true;
        }
        self.support == UpdateSupport::Reinit && current != *attempted
    }

    async fn update_in_place(&mut self, previous: Inputs, desired: Inputs) -> Step {
        let Some(handle) = self.live.as_ref().map(|live| live.handle.clone()) else {
            return Step::Again;
        };
        let instance = handle.instance();

        if previous.network != desired.network {
            let endpoint = self.endpoints.endpoint_for(desired.network);
            if let Err(source) = instance.set_network(desired.network, &endpoint).await {
                return self.fall_back_to_reinit("set_network", source, desired).await;
            }
            if let Some(live) = self.live.as_mut() {
                live.inputs.network = desired.network;
            }
            self.publish(LifecycleState::ready(handle.clone(), desired.network));
            self.log.record(
                EventKind::NetworkUpdated,
                payload!(
                    "from" => previous.network.as_str(),
                    "to" => desired.network.as_str(),
                    "endpoint" => endpoint.as_str(),
                ),
            );
            tracing::info!(from = %previous.network, to = %desired.network, "analytics network updated");
        }

        if previous.wallet != desired.wallet {
            let wallet = self.latest_wallet.clone();
            if let Err(source) = instance.set_wallet(&wallet).await {
                return self.fall_back_to_reinit("set_wallet", source, desired).await;
            }
            if let Some(live) = self.live.as_mut() {
                live.inputs.wallet = desired.wallet;
            }
            tracing::debug!(
                wallet = wallet.address().unwrap_or("-"),
                "analytics wallet updated"
            );
        }

        Step::Again
    }

    async fn fall_back_to_reinit(
        &mut self,
        operation: &'static str,
        source: ClientError,
        desired: Inputs,
    ) -> Step {
        let error = LifecycleError::Update { operation, source };
        tracing::warn!("{}; re-initializing analytics client", error);
        self.log.record(
            EventKind::UpdateError,
            payload!(
                "operation" => operation,
                "error" => error.to_string(),
                "code" => error.code(),
            ),
        );
        self.teardown("update_failed").await;
        self.create(desired).await
    }

    async fn teardown(&mut self, reason: &'static str) {
        let Some(live) = self.live.take() else {
            return;
        };
        let network = live.inputs.network;
        live.handle.retire();
        self.publish(LifecycleState::uninitialized(network));
        live.handle.instance().cleanup().await;
        self.log.record(
            EventKind::Teardown,
            payload!("cluster" => network.as_str(), "reason" => reason),
        );
        tracing::info!(
            generation = live.handle.generation(),
            reason,
            "analytics client torn down"
        );
    }

    async fn dispose(&mut self) {
        self.teardown("disposed").await;
        let network = self.state.borrow().network();
        self.publish(LifecycleState::torn_down(network));
        tracing::debug!("analytics lifecycle worker stopped");
    }
}
