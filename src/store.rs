/// Connection store
///
/// Local mirror of a wallet connection. Every field has a setter that only
/// notifies when the value actually changed, so listeners can react to
/// provider events without feedback loops.
///
use std::sync::{Arc, RwLock};

use tokio::sync::{broadcast, watch};

use crate::caip::CaipNetworkId;
use crate::chain::Chain;
use crate::connector::WalletProvider;
use crate::rpc::{Balance, RpcConnection};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Address,
    CaipChainId,
    CurrentChain,
    ProviderType,
    Provider,
    IsConnected,
    Balance,
    Error,
    Connection,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionState {
    pub address: Option<String>,
    pub caip_chain_id: Option<CaipNetworkId>,
    pub current_chain: Option<Chain>,
    pub provider_type: Option<String>,
    pub is_connected: bool,
    pub balance: Option<Balance>,
    pub error: Option<String>,
    pub connection: Option<RpcConnection>,
}

macro_rules! setter {
    ($name:ident, $field:ident, $ty:ty, $key:expr) => {
        pub fn $name(&self, value: $ty) -> bool {
            let changed = self.state.send_if_modified(|state| {
                if state.$field == value {
                    false
                } else {
                    state.$field = value;
                    true
                }
            });
            if changed {
                self.notify($key);
            }
            changed
        }
    };
}

pub struct ConnectionStore {
    state: watch::Sender<ConnectionState>,
    changes: broadcast::Sender<StoreKey>,
    provider: RwLock<Option<Arc<dyn WalletProvider>>>,
}

impl Default for ConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            state: watch::Sender::new(ConnectionState::default()),
            changes,
            provider: RwLock::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver of whole-state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Receiver that only wakes up when `key` changes.
    pub fn subscribe_key(&self, key: StoreKey) -> KeySubscription {
        KeySubscription {
            key,
            changes: self.changes.subscribe(),
        }
    }

    fn notify(&self, key: StoreKey) {
        // No listeners is fine
        let _ = self.changes.send(key);
    }

    setter!(set_address, address, Option<String>, StoreKey::Address);
    setter!(
        set_caip_chain_id,
        caip_chain_id,
        Option<CaipNetworkId>,
        StoreKey::CaipChainId
    );
    setter!(
        set_current_chain,
        current_chain,
        Option<Chain>,
        StoreKey::CurrentChain
    );
    setter!(
        set_provider_type,
        provider_type,
        Option<String>,
        StoreKey::ProviderType
    );
    setter!(set_is_connected, is_connected, bool, StoreKey::IsConnected);
    setter!(set_balance, balance, Option<Balance>, StoreKey::Balance);
    setter!(set_error, error, Option<String>, StoreKey::Error);
    setter!(
        set_connection,
        connection,
        Option<RpcConnection>,
        StoreKey::Connection
    );

    pub fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.provider.read().ok().and_then(|p| p.clone())
    }

    pub fn set_provider(&self, provider: Option<Arc<dyn WalletProvider>>) {
        let changed = match self.provider.write() {
            Ok(mut slot) => {
                let same = match (&*slot, &provider) {
                    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                    (None, None) => true,
                    _ => false,
                };
                *slot = provider;
                !same
            }
            Err(_) => false,
        };
        if changed {
            self.notify(StoreKey::Provider);
        }
    }

    /// Clears the connection. The selected chain and RPC endpoint stay.
    pub fn reset(&self) -> Vec<StoreKey> {
        let mut changed = vec![];
        if self.set_address(None) {
            changed.push(StoreKey::Address);
        }
        if self.set_provider_type(None) {
            changed.push(StoreKey::ProviderType);
        }
        if self.set_is_connected(false) {
            changed.push(StoreKey::IsConnected);
        }
        if self.set_balance(None) {
            changed.push(StoreKey::Balance);
        }
        if self.set_error(None) {
            changed.push(StoreKey::Error);
        }
        if self.provider().is_some() {
            self.set_provider(None);
            changed.push(StoreKey::Provider);
        }
        changed
    }
}

pub struct KeySubscription {
    key: StoreKey,
    changes: broadcast::Receiver<StoreKey>,
}

impl KeySubscription {
    pub fn key(&self) -> StoreKey {
        self.key
    }

    /// Waits for the next change of the subscribed key. Returns `false`
    /// once the store is gone.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.changes.recv().await {
                Ok(key) if key == self.key => return true,
                Ok(_) => continue,
                // Missed events, the key may have been among them
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }

    /// Non-blocking variant of [`KeySubscription::changed`].
    pub fn try_changed(&mut self) -> bool {
        loop {
            match self.changes.try_recv() {
                Ok(key) if key == self.key => return true,
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => return true,
                Err(_) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::solana;
    use crate::mock::MockProvider;

    #[test]
    fn test_setters_notify_only_on_change() {
        let store = ConnectionStore::new();
        let mut address = store.subscribe_key(StoreKey::Address);
        let mut connected = store.subscribe_key(StoreKey::IsConnected);

        assert!(store.set_address(Some("abc".to_string())));
        assert!(!store.set_address(Some("abc".to_string())));
        assert!(address.try_changed());
        assert!(!address.try_changed());
        assert!(!connected.try_changed());

        assert!(!store.set_is_connected(false));
        assert!(store.set_is_connected(true));
        assert!(connected.try_changed());
        assert!(!address.try_changed());
    }

    #[test]
    fn test_reset_keeps_chain() {
        let store = ConnectionStore::new();
        store.set_current_chain(Some(solana()));
        store.set_caip_chain_id(Some(CaipNetworkId::solana("x")));
        store.set_address(Some("abc".to_string()));
        store.set_is_connected(true);
        store.set_provider_type(Some("injected_phantom".to_string()));
        store.set_provider(Some(Arc::new(MockProvider::new("Phantom", None))));

        let changed = store.reset();
        assert_eq!(
            changed,
            vec![
                StoreKey::Address,
                StoreKey::ProviderType,
                StoreKey::IsConnected,
                StoreKey::Provider
            ]
        );

        let state = store.state();
        assert_eq!(state.address, None);
        assert!(!state.is_connected);
        assert_eq!(state.current_chain, Some(solana()));
        assert_eq!(state.caip_chain_id, Some(CaipNetworkId::solana("x")));
        assert!(store.provider().is_none());

        assert!(store.reset().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_subscription() {
        let store = ConnectionStore::new();
        let mut rx = store.subscribe();
        store.set_error(Some("boom".to_string()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_key_subscription_async() {
        let store = Arc::new(ConnectionStore::new());
        let mut sub = store.subscribe_key(StoreKey::CaipChainId);

        let writer = store.clone();
        tokio::spawn(async move {
            writer.set_address(Some("a".to_string()));
            writer.set_caip_chain_id(Some(CaipNetworkId::eip155(1)));
        });

        assert!(sub.changed().await);
        assert_eq!(
            store.state().caip_chain_id,
            Some(CaipNetworkId::eip155(1))
        );
    }

    #[test]
    fn test_set_same_provider_is_noop() {
        let store = ConnectionStore::new();
        let provider: Arc<dyn WalletProvider> =
            Arc::new(MockProvider::new("Phantom", None));
        let mut sub = store.subscribe_key(StoreKey::Provider);
        store.set_provider(Some(provider.clone()));
        assert!(sub.try_changed());
        store.set_provider(Some(provider));
        assert!(!sub.try_changed());
    }
}
