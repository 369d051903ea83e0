use crate::event_log::{EventKind, EventPayload};
use crate::payload;
use crate::wallet::WalletSnapshot;

/// Turns the ordered stream of wallet notifications into connect and
/// disconnect log entries.
///
/// Each physical connection is announced once, and each disconnect once,
/// no matter how many redundant notifications repeat it. Announcements are
/// only emitted while `announce` is set (a live analytics instance exists).
/// A connection seen while silent stays pending until [`announce_pending`]
/// or a later announcing observation reports it.
///
/// [`announce_pending`]: WalletEventTracker::announce_pending
#[derive(Debug, Default)]
pub(super) struct WalletEventTracker {
    /// Address and wallet name of the current connection.
    connection: Option<(String, String)>,
    announced: bool,
    disconnect_announced: bool,
}

impl WalletEventTracker {
    pub(super) fn observe(
        &mut self,
        wallet: &WalletSnapshot,
        announce: bool,
    ) -> Vec<(EventKind, EventPayload)> {
        let mut events = Vec::new();

        match wallet.address() {
            Some(address) => {
                self.disconnect_announced = false;
                let same = self.connection.as_ref().is_some_and(|(a, _)| a == address);
                if !same {
                    let name = wallet.wallet_name.as_deref().unwrap_or("Unknown");
                    self.connection = Some((address.to_string(), name.to_string()));
                    self.announced = false;
                }
            }
            None => {
                self.connection = None;
                self.announced = false;
                if !wallet.disconnecting {
                    self.disconnect_announced = false;
                } else if announce && !wallet.connected && !self.disconnect_announced {
                    self.disconnect_announced = true;
                    events.push((EventKind::WalletDisconnecting, payload!()));
                }
            }
        }

        if announce {
            events.extend(self.announce_pending());
        }
        events
    }

    /// Announce a connection observed while no instance was live.
    pub(super) fn announce_pending(&mut self) -> Option<(EventKind, EventPayload)> {
        if self.announced {
            return None;
        }
        let (address, name) = self.connection.as_ref()?;
        let event = (
            EventKind::WalletConnected,
            payload!("address" => address.as_str(), "walletName" => name.as_str()),
        );
        self.announced = true;
        Some(event)
    }
}
