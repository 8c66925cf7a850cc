/// AppKit
///
/// State shared by every chain client: one account slot per chain
/// namespace, the network selection and the list of connectors offered
/// to the user. Clients write into it, UIs subscribe to it.
///
use std::collections::HashMap;

use tokio::sync::watch;

use crate::caip::{CaipAddress, CaipNetworkId, ChainNamespace};
use crate::chain::CaipNetwork;
use crate::connector::Connector;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountState {
    pub caip_address: Option<CaipAddress>,
    pub is_connected: bool,
    pub balance: Option<String>,
    pub balance_symbol: Option<String>,
    pub address_explorer_url: Option<String>,
}

impl AccountState {
    pub fn address(&self) -> Option<&str> {
        self.caip_address.as_ref().map(|a| a.address.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkState {
    pub caip_network: Option<CaipNetwork>,
    pub requested_caip_networks: HashMap<ChainNamespace, Vec<CaipNetwork>>,
    pub approved_caip_network_ids: Option<Vec<CaipNetworkId>>,
    pub supports_all_networks: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppKitState {
    pub accounts: HashMap<ChainNamespace, AccountState>,
    pub network: NetworkState,
    pub active_chain: Option<ChainNamespace>,
    pub connectors: Vec<Connector>,
    pub eip6963_enabled: bool,
    /// Set while a WalletConnect pairing uri is on display
    pub wc_uri: Option<String>,
}

/// Result of `getApprovedCaipNetworksData` on a network controller client.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApprovedCaipNetworksData {
    pub approved_caip_network_ids: Option<Vec<CaipNetworkId>>,
    pub supports_all_networks: bool,
}

pub struct AppKit {
    state: watch::Sender<AppKitState>,
}

impl Default for AppKit {
    fn default() -> Self {
        Self::new()
    }
}

impl AppKit {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(AppKitState {
                network: NetworkState {
                    supports_all_networks: true,
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    pub fn state(&self) -> AppKitState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppKitState> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut AppKitState)) {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }

    fn update_account(
        &self,
        chain: &ChainNamespace,
        f: impl FnOnce(&mut AccountState),
    ) {
        self.update(|state| {
            f(state.accounts.entry(chain.clone()).or_default());
        });
    }

    pub fn account(&self, chain: &ChainNamespace) -> AccountState {
        self.state
            .borrow()
            .accounts
            .get(chain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_is_connected(&self, is_connected: bool, chain: &ChainNamespace) {
        self.update_account(chain, |a| a.is_connected = is_connected);
    }

    pub fn set_caip_address(
        &self,
        caip_address: Option<CaipAddress>,
        chain: &ChainNamespace,
    ) {
        self.update_account(chain, |a| a.caip_address = caip_address);
    }

    pub fn set_balance(
        &self,
        balance: Option<String>,
        symbol: Option<String>,
        chain: &ChainNamespace,
    ) {
        self.update_account(chain, |a| {
            a.balance = balance;
            a.balance_symbol = symbol;
        });
    }

    pub fn set_address_explorer_url(
        &self,
        url: Option<String>,
        chain: &ChainNamespace,
    ) {
        self.update_account(chain, |a| a.address_explorer_url = url);
    }

    pub fn reset_account(&self, chain: &ChainNamespace) {
        self.update_account(chain, |a| *a = AccountState::default());
    }

    pub fn get_is_connected(&self, chain: &ChainNamespace) -> bool {
        self.account(chain).is_connected
    }

    pub fn set_requested_caip_networks(
        &self,
        networks: Vec<CaipNetwork>,
        chain: &ChainNamespace,
    ) {
        self.update(|state| {
            state
                .network
                .requested_caip_networks
                .insert(chain.clone(), networks);
        });
    }

    /// Requested networks of every namespace, in namespace order.
    pub fn get_requested_caip_networks(&self) -> Vec<CaipNetwork> {
        let state = self.state.borrow();
        let mut namespaces: Vec<_> =
            state.network.requested_caip_networks.keys().collect();
        namespaces.sort();
        namespaces
            .into_iter()
            .flat_map(|ns| state.network.requested_caip_networks[ns].clone())
            .collect()
    }

    pub fn set_caip_network(&self, network: Option<CaipNetwork>) {
        self.update(|state| {
            if let Some(network) = &network {
                state.active_chain = Some(network.chain_namespace.clone());
            }
            state.network.caip_network = network;
        });
    }

    pub fn caip_network(&self) -> Option<CaipNetwork> {
        self.state.borrow().network.caip_network.clone()
    }

    pub fn set_active_chain(&self, chain: ChainNamespace) {
        self.update(|state| state.active_chain = Some(chain));
    }

    pub fn set_approved_caip_networks_data(
        &self,
        data: ApprovedCaipNetworksData,
    ) {
        self.update(|state| {
            state.network.approved_caip_network_ids =
                data.approved_caip_network_ids;
            state.network.supports_all_networks = data.supports_all_networks;
        });
    }

    /// Approved network ids across namespaces, `None` when no client
    /// reported any.
    pub fn get_all_approved_caip_networks(&self) -> Option<Vec<CaipNetworkId>> {
        self.state.borrow().network.approved_caip_network_ids.clone()
    }

    /// Replaces the connectors of the namespaces present in `connectors`,
    /// keeping the ones other clients registered.
    pub fn set_connectors(&self, connectors: Vec<Connector>) {
        self.update(|state| {
            state
                .connectors
                .retain(|c| !connectors.iter().any(|n| n.chain == c.chain));
            state.connectors.extend(connectors);
        });
    }

    pub fn get_connectors(&self) -> Vec<Connector> {
        self.state.borrow().connectors.clone()
    }

    pub fn set_eip6963_enabled(&self, enabled: bool) {
        self.update(|state| state.eip6963_enabled = enabled);
    }

    pub fn set_wc_uri(&self, uri: Option<String>) {
        self.update(|state| state.wc_uri = uri);
    }

    pub fn reset_wc_connection(&self) {
        self.update(|state| state.wc_uri = None);
    }

    pub fn reset_network(&self) {
        self.update(|state| {
            state.network.approved_caip_network_ids = None;
            state.network.supports_all_networks = true;
        });
    }
}
