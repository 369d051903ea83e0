//! Local analytics client that reports through `tracing`.
//!
//! Used by the terminal front-end so the lifecycle can be exercised without
//! network access. Events are emitted on the `formo_sync::analytics` target.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{AnalyticsFactory, AnalyticsInstance, InitOptions, UpdateSupport};
use crate::config::WriteKey;
use crate::error::ClientError;
use crate::event_log::EventPayload;
use crate::network::Network;
use crate::wallet::WalletSnapshot;

const TARGET: &str = "formo_sync::analytics";

#[derive(Debug, Clone, Copy)]
pub struct ConsoleAnalytics {
    support: UpdateSupport,
}

impl ConsoleAnalytics {
    pub fn new(support: UpdateSupport) -> Self {
        Self { support }
    }
}

impl Default for ConsoleAnalytics {
    fn default() -> Self {
        Self::new(UpdateSupport::InPlace)
    }
}

#[async_trait]
impl AnalyticsFactory for ConsoleAnalytics {
    fn name(&self) -> &str {
        "console"
    }

    fn update_support(&self) -> UpdateSupport {
        self.support
    }

    async fn init(
        &self,
        write_key: &WriteKey,
        options: InitOptions,
    ) -> Result<Box<dyn AnalyticsInstance>, ClientError> {
        if write_key.expose().chars().any(char::is_whitespace) {
            return Err(ClientError::Rejected(
                "write key must not contain whitespace".to_string(),
            ));
        }

        let session_id = Uuid::new_v4();
        tracing::info!(
            target: TARGET,
            %session_id,
            key = %write_key.fingerprint(),
            network = %options.network,
            endpoint = %options.endpoint,
            wallet = options.wallet.address().unwrap_or("-"),
            "session opened"
        );

        Ok(Box::new(ConsoleInstance {
            session_id,
            state: Mutex::new(SessionState {
                network: options.network,
                endpoint: options.endpoint,
                address: options.wallet.address().map(str::to_string),
            }),
        }))
    }
}

#[derive(Debug)]
struct SessionState {
    network: Network,
    endpoint: String,
    address: Option<String>,
}

struct ConsoleInstance {
    session_id: Uuid,
    state: Mutex<SessionState>,
}

impl ConsoleInstance {
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl AnalyticsInstance for ConsoleInstance {
    async fn track(&self, event: &str, properties: &EventPayload) -> Result<(), ClientError> {
        let (network, address) =
            self.with_state(|s| (s.network, s.address.clone().unwrap_or_default()));
        let properties = serde_json::to_string(properties)
            .map_err(|e| ClientError::Rejected(format!("unserializable properties: {e}")))?;
        tracing::info!(
            target: TARGET,
            session_id = %self.session_id,
            %network,
            %address,
            event,
            %properties,
            "track"
        );
        Ok(())
    }

    async fn set_wallet(&self, wallet: &WalletSnapshot) -> Result<(), ClientError> {
        let address = wallet.address().map(str::to_string);
        tracing::info!(
            target: TARGET,
            session_id = %self.session_id,
            wallet = address.as_deref().unwrap_or("-"),
            "wallet updated"
        );
        self.with_state(|s| s.address = address);
        Ok(())
    }

    async fn set_network(&self, network: Network, endpoint: &str) -> Result<(), ClientError> {
        tracing::info!(
            target: TARGET,
            session_id = %self.session_id,
            %network,
            endpoint,
            "network updated"
        );
        self.with_state(|s| {
            s.network = network;
            s.endpoint = endpoint.to_string();
        });
        Ok(())
    }

    async fn cleanup(&self) {
        let endpoint = self.with_state(|s| s.endpoint.clone());
        tracing::info!(
            target: TARGET,
            session_id = %self.session_id,
            %endpoint,
            "session closed"
        );
    }
}
