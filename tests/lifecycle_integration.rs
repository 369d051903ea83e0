//! End-to-end tests for the analytics lifecycle controller.
//!
//! A scripted in-memory analytics client counts every init, cleanup and
//! update so each test can assert exactly how the controller reacted to a
//! sequence of wallet, network and credential changes.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;
use tokio::time::timeout;

use formo_sync::analytics::{AnalyticsFactory, AnalyticsInstance, InitOptions, UpdateSupport};
use formo_sync::config::WriteKey;
use formo_sync::error::{ClientError, TrackError};
use formo_sync::event_log::{EVENT_LOG_CAPACITY, EventKind, EventLog, EventPayload};
use formo_sync::lifecycle::{AnalyticsController, ControllerInputs, Phase, StatusIndicator};
use formo_sync::network::{EndpointResolver, Network, NetworkSelection};
use formo_sync::payload;
use formo_sync::wallet::{WalletFeed, WalletSnapshot};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Script {
    inits: AtomicUsize,
    cleanups: AtomicUsize,
    set_wallet_calls: AtomicUsize,
    set_network_calls: AtomicUsize,
    tracked: AtomicUsize,
    fail_init: AtomicBool,
    fail_updates: AtomicBool,
    fail_track: AtomicBool,
    init_options: Mutex<Vec<InitOptions>>,
    network_endpoints: Mutex<Vec<String>>,
}

impl Script {
    fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    fn last_init(&self) -> InitOptions {
        self.init_options.lock().unwrap().last().cloned().unwrap()
    }
}

struct ScriptedFactory {
    support: UpdateSupport,
    script: Arc<Script>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl AnalyticsFactory for ScriptedFactory {
    fn name(&self) -> &str {
        "scripted"
    }

    fn update_support(&self) -> UpdateSupport {
        self.support
    }

    async fn init(
        &self,
        _write_key: &WriteKey,
        options: InitOptions,
    ) -> Result<Box<dyn AnalyticsInstance>, ClientError> {
        self.script.inits.fetch_add(1, Ordering::SeqCst);
        self.script.init_options.lock().unwrap().push(options);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.script.fail_init.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected("invalid write key".to_string()));
        }
        Ok(Box::new(ScriptedInstance {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedInstance {
    script: Arc<Script>,
}

#[async_trait]
impl AnalyticsInstance for ScriptedInstance {
    async fn track(&self, _event: &str, _properties: &EventPayload) -> Result<(), ClientError> {
        if self.script.fail_track.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("queue full".to_string()));
        }
        self.script.tracked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_wallet(&self, _wallet: &WalletSnapshot) -> Result<(), ClientError> {
        if self.script.fail_updates.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("socket closed".to_string()));
        }
        self.script.set_wallet_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_network(&self, _network: Network, endpoint: &str) -> Result<(), ClientError> {
        if self.script.fail_updates.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("socket closed".to_string()));
        }
        self.script.set_network_calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .network_endpoints
            .lock()
            .unwrap()
            .push(endpoint.to_string());
        Ok(())
    }

    async fn cleanup(&self) {
        self.script.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    controller: AnalyticsController,
    network: NetworkSelection,
    wallet: WalletFeed,
    log: Arc<EventLog>,
    script: Arc<Script>,
}

impl Harness {
    fn count(&self, kind: EventKind) -> usize {
        self.log.count_of(&kind)
    }

    async fn flush(&self) {
        timeout(TIMEOUT, self.controller.flush())
            .await
            .expect("controller did not settle");
    }
}

struct Setup {
    support: UpdateSupport,
    write_key: Option<&'static str>,
    wallet: WalletSnapshot,
    endpoints: EndpointResolver,
    gate: Option<Arc<Notify>>,
    script: Script,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            support: UpdateSupport::InPlace,
            write_key: Some("wk_test"),
            wallet: WalletSnapshot::disconnected(),
            endpoints: EndpointResolver::default(),
            gate: None,
            script: Script::default(),
        }
    }
}

fn start(setup: Setup) -> Harness {
    let script = Arc::new(setup.script);
    let network = NetworkSelection::new(Network::Devnet);
    let wallet = WalletFeed::new(setup.wallet);
    let log = Arc::new(EventLog::new());
    let factory = ScriptedFactory {
        support: setup.support,
        script: Arc::clone(&script),
        gate: setup.gate,
    };
    let controller = AnalyticsController::spawn(
        Arc::new(factory),
        ControllerInputs {
            write_key: setup.write_key.and_then(WriteKey::parse),
            endpoints: setup.endpoints,
            network: network.subscribe(),
            wallet: wallet.subscribe(),
            event_log: Arc::clone(&log),
        },
    );
    Harness {
        controller,
        network,
        wallet,
        log,
        script,
    }
}

async fn wait_for_inits(script: &Script, expected: usize) {
    timeout(TIMEOUT, async {
        while script.inits() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("init was never called");
}

#[tokio::test]
async fn missing_credential_fails_without_calling_init() {
    let h = start(Setup {
        write_key: None,
        ..Setup::default()
    });
    h.flush().await;

    let state = h.controller.state();
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(
        h.controller.error().as_deref(),
        Some("Missing FORMO_WRITE_KEY credential")
    );
    assert_eq!(h.script.inits(), 0);
    assert_eq!(h.count(EventKind::InitError), 1);

    // Input churn does not repeat the report or reach the factory.
    h.wallet.publish(WalletSnapshot::connected("PK1", None));
    h.flush().await;
    h.network.set("testnet");
    h.flush().await;
    assert_eq!(h.script.inits(), 0);
    assert_eq!(h.count(EventKind::InitError), 1);
    assert_eq!(h.controller.state().network(), Network::Testnet);
}

#[tokio::test]
async fn placeholder_key_counts_as_missing() {
    let h = start(Setup {
        write_key: Some("your_write_key_here"),
        ..Setup::default()
    });
    h.flush().await;
    assert_eq!(h.controller.state().phase(), Phase::Failed);
    assert_eq!(h.script.inits(), 0);
}

#[tokio::test]
async fn wallet_connect_updates_live_instance_once() {
    let h = start(Setup::default());
    h.flush().await;
    assert!(h.controller.is_initialized());
    assert_eq!(h.controller.status(), StatusIndicator::Active);
    assert_eq!(h.count(EventKind::InitStarted), 1);
    assert_eq!(h.count(EventKind::InitSuccess), 1);
    let handle = h.controller.instance().unwrap();

    for _ in 0..5 {
        h.wallet
            .publish(WalletSnapshot::connected("PK1", Some("Phantom".to_string())));
    }
    h.flush().await;

    assert_eq!(h.count(EventKind::WalletConnected), 1);
    assert_eq!(h.count(EventKind::InitStarted), 1);
    assert_eq!(h.script.set_wallet_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.instance(), Some(handle));

    let entries = h.controller.event_log_entries();
    assert_eq!(entries[0].kind, EventKind::WalletConnected);
    assert_eq!(entries[0].payload["address"], "PK1");
    assert_eq!(entries[0].payload["walletName"], "Phantom");
}

#[tokio::test]
async fn connected_wallet_at_start_is_passed_to_init() {
    let h = start(Setup {
        wallet: WalletSnapshot::connected("PK1", None),
        ..Setup::default()
    });
    h.flush().await;

    let options = h.script.last_init();
    assert_eq!(options.wallet.address(), Some("PK1"));
    assert_eq!(options.endpoint, "https://api.devnet.solana.com");

    let kinds: Vec<EventKind> = h
        .controller
        .event_log_entries()
        .into_iter()
        .map(|entry| entry.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::WalletConnected,
            EventKind::InitSuccess,
            EventKind::InitStarted
        ]
    );
    assert_eq!(
        h.controller.event_log_entries()[2].payload["hasWallet"],
        true
    );
    assert_eq!(h.script.set_wallet_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disconnect_is_logged_once() {
    let h = start(Setup {
        wallet: WalletSnapshot::connected("PK1", None),
        ..Setup::default()
    });
    h.flush().await;

    let leaving = h.wallet.current().disconnecting();
    h.wallet.publish(leaving.clone());
    h.flush().await;
    h.wallet.publish(leaving);
    h.flush().await;
    h.wallet.publish(WalletSnapshot::disconnected());
    h.flush().await;

    assert_eq!(h.count(EventKind::WalletDisconnecting), 1);
    assert_eq!(h.count(EventKind::InitStarted), 1);

    h.wallet.publish(WalletSnapshot::connected("PK1", None));
    h.flush().await;
    assert_eq!(h.count(EventKind::WalletConnected), 2);
}

#[tokio::test]
async fn disconnect_steps_published_back_to_back_are_both_seen() {
    let h = start(Setup {
        wallet: WalletSnapshot::connected("PK1", None),
        ..Setup::default()
    });
    h.flush().await;

    let connected = h.wallet.current();
    h.wallet.publish(connected.disconnecting());
    h.wallet.publish(WalletSnapshot::disconnected());
    h.flush().await;

    assert_eq!(h.count(EventKind::WalletDisconnecting), 1);
    assert_eq!(h.count(EventKind::WalletConnected), 1);
    assert_eq!(h.script.set_wallet_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.script.inits(), 1);
}

#[tokio::test]
async fn fast_reconnect_with_same_key_logs_each_connection() {
    let h = start(Setup {
        wallet: WalletSnapshot::connected("PK1", Some("Phantom".to_string())),
        ..Setup::default()
    });
    h.flush().await;
    assert_eq!(h.count(EventKind::WalletConnected), 1);

    let connected = h.wallet.current();
    h.wallet.publish(connected.disconnecting());
    h.wallet.publish(WalletSnapshot::disconnected());
    h.wallet.publish(connected);
    h.flush().await;

    assert_eq!(h.count(EventKind::WalletConnected), 2);
    assert_eq!(h.count(EventKind::WalletDisconnecting), 1);
    // Same identity at rest: the instance is left alone.
    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.script.cleanups(), 0);

    let kinds: Vec<EventKind> = h
        .controller
        .event_log_entries()
        .into_iter()
        .take(2)
        .map(|entry| entry.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![EventKind::WalletConnected, EventKind::WalletDisconnecting]
    );
}

#[tokio::test]
async fn network_change_updates_in_place() {
    let h = start(Setup::default());
    h.flush().await;

    assert!(h.network.set("mainnet-beta"));
    h.flush().await;

    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.script.set_network_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.count(EventKind::NetworkUpdated), 1);
    assert_eq!(h.controller.state().network(), Network::MainnetBeta);
    assert!(h.controller.is_initialized());

    let entry = &h.controller.event_log_entries()[0];
    assert_eq!(entry.payload["from"], "devnet");
    assert_eq!(entry.payload["to"], "mainnet-beta");
    assert_eq!(entry.payload["endpoint"], "https://api.mainnet-beta.solana.com");

    // Accepted, but the same value again is not a change.
    assert!(h.network.set("mainnet"));
    h.flush().await;
    assert_eq!(h.count(EventKind::NetworkUpdated), 1);
}

#[tokio::test]
async fn network_change_reinitializes_when_updates_unsupported() {
    let h = start(Setup {
        support: UpdateSupport::Reinit,
        ..Setup::default()
    });
    h.flush().await;
    let first = h.controller.instance().unwrap();

    h.network.set("testnet");
    h.flush().await;

    assert_eq!(h.script.inits(), 2);
    assert_eq!(h.script.cleanups(), 1);
    assert_eq!(h.script.set_network_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.count(EventKind::Teardown), 1);
    assert_eq!(h.count(EventKind::InitStarted), 2);
    assert_eq!(h.script.last_init().network, Network::Testnet);

    let second = h.controller.instance().unwrap();
    assert!(first.is_retired());
    assert!(!second.is_retired());
    assert_eq!(second.generation(), 2);
}

#[tokio::test]
async fn wallet_change_reinitializes_when_updates_unsupported() {
    let h = start(Setup {
        support: UpdateSupport::Reinit,
        ..Setup::default()
    });
    h.flush().await;
    let first = h.controller.instance().unwrap();

    h.wallet
        .publish(WalletSnapshot::connected("PK1", Some("Phantom".to_string())));
    h.flush().await;

    assert_eq!(h.script.inits(), 2);
    assert_eq!(h.script.cleanups(), 1);
    assert_eq!(h.script.set_wallet_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.count(EventKind::Teardown), 1);
    assert_eq!(h.count(EventKind::WalletConnected), 1);
    assert_eq!(h.script.last_init().wallet.address(), Some("PK1"));
    assert!(first.is_retired());
    assert!(h.controller.is_initialized());

    let teardown = h
        .controller
        .event_log_entries()
        .into_iter()
        .find(|entry| entry.kind == EventKind::Teardown)
        .unwrap();
    assert_eq!(teardown.payload["reason"], "inputs_changed");
}

#[tokio::test]
async fn custom_endpoint_follows_the_default_network() {
    const CUSTOM: &str = "https://rpc.example.com";
    let h = start(Setup {
        endpoints: EndpointResolver::new(Network::Devnet, Some(CUSTOM.to_string())),
        ..Setup::default()
    });
    h.flush().await;
    assert_eq!(h.script.last_init().endpoint, CUSTOM);
    assert_eq!(h.controller.event_log_entries()[1].payload["endpoint"], CUSTOM);

    h.network.set("testnet");
    h.flush().await;
    h.network.set("devnet");
    h.flush().await;

    assert_eq!(
        *h.script.network_endpoints.lock().unwrap(),
        vec!["https://api.testnet.solana.com".to_string(), CUSTOM.to_string()]
    );
    assert_eq!(h.controller.event_log_entries()[0].payload["endpoint"], CUSTOM);
    assert_eq!(h.script.inits(), 1);
}

#[tokio::test]
async fn custom_endpoint_is_dropped_on_reinit_away_from_default() {
    let h = start(Setup {
        support: UpdateSupport::Reinit,
        endpoints: EndpointResolver::new(
            Network::Devnet,
            Some("https://rpc.example.com".to_string()),
        ),
        ..Setup::default()
    });
    h.flush().await;

    h.network.set("mainnet-beta");
    h.flush().await;

    assert_eq!(h.script.inits(), 2);
    assert_eq!(
        h.script.last_init().endpoint,
        "https://api.mainnet-beta.solana.com"
    );
}

#[tokio::test]
async fn invalid_network_is_ignored() {
    let h = start(Setup::default());
    h.flush().await;

    assert!(!h.network.set("moonnet"));
    h.flush().await;

    assert_eq!(h.network.current(), Network::Devnet);
    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.count(EventKind::NetworkUpdated), 0);
}

#[tokio::test]
async fn shutdown_during_initializing_cleans_up_once() {
    let gate = Arc::new(Notify::new());
    let h = start(Setup {
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    });
    let mut state = h.controller.subscribe();
    timeout(TIMEOUT, state.wait_for(|s| s.phase() == Phase::Initializing))
        .await
        .unwrap()
        .unwrap();

    let shutdown = tokio::spawn(h.controller.shutdown());
    gate.notify_one();
    timeout(TIMEOUT, shutdown).await.unwrap().unwrap();

    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.script.cleanups(), 1);
    assert_eq!(h.log.count_of(&EventKind::InitSuccess), 0);
    assert_eq!(state.borrow().phase(), Phase::TornDown);
    assert!(state.borrow().instance().is_none());
}

#[tokio::test]
async fn drop_during_initializing_cleans_up_once() {
    let gate = Arc::new(Notify::new());
    let h = start(Setup {
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    });
    let mut state = h.controller.subscribe();
    timeout(TIMEOUT, state.wait_for(|s| s.phase() == Phase::Initializing))
        .await
        .unwrap()
        .unwrap();

    let Harness { controller, script, .. } = h;
    drop(controller);
    gate.notify_one();

    timeout(TIMEOUT, state.wait_for(|s| s.phase() == Phase::TornDown))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(script.cleanups(), 1);
    assert!(state.borrow().instance().is_none());
}

#[tokio::test]
async fn shutdown_tears_down_live_instance() {
    let h = start(Setup::default());
    h.flush().await;
    let handle = h.controller.instance().unwrap();
    let state = h.controller.subscribe();

    h.controller.shutdown().await;

    assert_eq!(h.script.cleanups(), 1);
    assert!(handle.is_retired());
    assert_eq!(state.borrow().phase(), Phase::TornDown);
    assert_eq!(state.borrow().status(), StatusIndicator::Stopped);
    assert_eq!(h.log.entries()[0].kind, EventKind::Teardown);
}

#[tokio::test]
async fn event_log_stays_bounded_under_notification_storm() {
    let h = start(Setup::default());
    h.flush().await;

    for _ in 0..1_000 {
        h.wallet.publish(WalletSnapshot::connected("PK1", None));
    }
    h.flush().await;
    assert_eq!(h.count(EventKind::WalletConnected), 1);

    for i in 0..200 {
        h.wallet
            .publish(WalletSnapshot::connected(format!("PK{i}"), None));
        h.flush().await;
        assert!(h.log.len() <= EVENT_LOG_CAPACITY);
    }
    assert_eq!(h.log.len(), EVENT_LOG_CAPACITY);
    assert_eq!(h.log.entries()[0].payload["address"], "PK199");
}

#[tokio::test]
async fn failed_init_is_not_retried_for_unchanged_inputs() {
    let script = Script::default();
    script.fail_init.store(true, Ordering::SeqCst);
    let h = start(Setup {
        script,
        ..Setup::default()
    });
    h.flush().await;

    assert_eq!(h.controller.state().phase(), Phase::Failed);
    assert_eq!(h.controller.error().as_deref(), Some("invalid write key"));
    assert_eq!(h.script.inits(), 1);

    // Redundant notifications.
    for _ in 0..10 {
        h.wallet.publish(WalletSnapshot::disconnected());
    }
    h.flush().await;
    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.count(EventKind::InitError), 1);

    // A distinct input is a new attempt.
    h.script.fail_init.store(false, Ordering::SeqCst);
    h.network.set("testnet");
    h.flush().await;
    assert_eq!(h.script.inits(), 2);
    assert!(h.controller.is_initialized());
    assert_eq!(h.controller.error(), None);
}

#[tokio::test]
async fn update_failure_falls_back_to_reinit() {
    let h = start(Setup::default());
    h.flush().await;
    h.script.fail_updates.store(true, Ordering::SeqCst);

    h.wallet.publish(WalletSnapshot::connected("PK1", None));
    h.flush().await;

    assert_eq!(h.count(EventKind::UpdateError), 1);
    assert_eq!(h.script.inits(), 2);
    assert_eq!(h.script.cleanups(), 1);
    assert_eq!(h.script.last_init().wallet.address(), Some("PK1"));
    assert!(h.controller.is_initialized());
    assert_eq!(h.count(EventKind::WalletConnected), 1);
}

#[tokio::test]
async fn track_failures_leave_lifecycle_untouched() {
    let h = start(Setup {
        write_key: None,
        ..Setup::default()
    });
    h.flush().await;
    assert_eq!(
        h.controller.track("swap", EventPayload::new()).await,
        Err(TrackError::NotInitialized)
    );

    h.controller.set_write_key(WriteKey::parse("wk_test"));
    h.flush().await;
    assert!(h.controller.is_initialized());

    assert_eq!(
        h.controller.track("  ", EventPayload::new()).await,
        Err(TrackError::InvalidEventName)
    );

    h.script.fail_track.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.controller.track("swap", EventPayload::new()).await,
        Err(TrackError::Client(_))
    ));
    h.flush().await;
    assert!(h.controller.is_initialized());
    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.count(EventKind::EventTracked), 0);

    h.script.fail_track.store(false, Ordering::SeqCst);
    h.controller
        .track("swap", payload!("token_in" => "SOL"))
        .await
        .unwrap();
    assert_eq!(h.count(EventKind::EventTracked), 1);
    assert_eq!(h.controller.event_log_entries()[0].payload["event"], "swap");
}

#[tokio::test]
async fn credential_change_retires_previous_handle() {
    let h = start(Setup::default());
    h.flush().await;
    let handle = h.controller.instance().unwrap();

    assert!(!h.controller.set_write_key(WriteKey::parse("wk_test")));
    assert!(h.controller.set_write_key(WriteKey::parse("wk_rotated")));
    h.flush().await;

    assert_eq!(h.script.inits(), 2);
    assert_eq!(
        handle.track("swap", &EventPayload::new()).await,
        Err(TrackError::Retired)
    );

    h.controller.set_write_key(None);
    h.flush().await;
    assert_eq!(h.script.cleanups(), 2);
    assert_eq!(h.controller.state().phase(), Phase::Failed);
    assert!(h.controller.instance().is_none());
}

#[tokio::test]
async fn change_during_init_supersedes_stale_instance() {
    let gate = Arc::new(Notify::new());
    let h = start(Setup {
        support: UpdateSupport::Reinit,
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    });
    wait_for_inits(&h.script, 1).await;

    h.network.set("testnet");
    gate.notify_one();
    wait_for_inits(&h.script, 2).await;
    gate.notify_one();
    h.flush().await;

    assert_eq!(h.script.cleanups(), 1);
    assert!(h.controller.is_initialized());
    assert_eq!(h.controller.state().network(), Network::Testnet);
    assert_eq!(h.controller.instance().unwrap().generation(), 2);
    assert_eq!(h.count(EventKind::InitSuccess), 1);
}

#[tokio::test]
async fn change_during_in_place_init_is_applied_to_published_instance() {
    let gate = Arc::new(Notify::new());
    let h = start(Setup {
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    });
    wait_for_inits(&h.script, 1).await;

    h.network.set("testnet");
    h.wallet.publish(WalletSnapshot::connected("PK1", None));
    gate.notify_one();
    h.flush().await;

    assert_eq!(h.script.inits(), 1);
    assert_eq!(h.script.cleanups(), 0);
    assert_eq!(h.script.last_init().network, Network::Devnet);
    assert_eq!(h.script.set_network_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.script.set_wallet_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.count(EventKind::Teardown), 0);
    assert_eq!(h.count(EventKind::NetworkUpdated), 1);
    assert_eq!(h.count(EventKind::WalletConnected), 1);

    assert!(h.controller.is_initialized());
    assert_eq!(h.controller.state().network(), Network::Testnet);
    assert_eq!(h.controller.instance().unwrap().generation(), 1);
}
