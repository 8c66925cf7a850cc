/// Network selection
///
/// The decisions a network picker makes, without the picker: which
/// networks come first, which ones are greyed out and what happens when
/// the user taps one.
///
use crate::appkit::AppKitState;
use crate::caip::{CaipNetworkId, ChainNamespace};
use crate::chain::CaipNetwork;
use crate::connector::ConnectorType;
use crate::constants::{CONNECTED_CONNECTOR, WALLET_CONNECT_CONNECTOR_ID, WALLET_ID};
use crate::storage::Storage;

/// Approved networks first, in approved order, then the remaining
/// requested networks in their original order.
pub fn sort_requested_networks(
    approved: Option<&[CaipNetworkId]>,
    requested: &[CaipNetwork],
) -> Vec<CaipNetwork> {
    let mut sorted = requested.to_vec();
    if let Some(approved) = approved {
        sorted.sort_by_key(|network| {
            approved
                .iter()
                .position(|id| *id == network.id)
                .unwrap_or(usize::MAX)
        });
    }
    sorted
}

/// Case-insensitive name filter. Unnamed networks never match a
/// non-empty search.
pub fn filter_networks(networks: &[CaipNetwork], search: &str) -> Vec<CaipNetwork> {
    let search = search.trim().to_lowercase();
    if search.is_empty() {
        return networks.to_vec();
    }
    networks
        .iter()
        .filter(|n| {
            n.name
                .as_ref()
                .is_some_and(|name| name.to_lowercase().contains(&search))
        })
        .cloned()
        .collect()
}

/// Screen the picker moves to when no wallet is connected yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectView {
    Connect,
    ConnectingWalletConnect,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NetworkSwitchAction {
    /// The wallet is connected on another namespace, ask to connect one
    /// for `switch_to_chain` first.
    SwitchActiveChain {
        switch_to_chain: ChainNamespace,
        network: CaipNetwork,
    },
    /// Ask the connected wallet to switch right away.
    Switch(CaipNetwork),
    /// Show a switch prompt, the wallet may not know the network.
    PromptSwitch(CaipNetwork),
    /// Nothing is connected: make `network` the active one and optionally
    /// continue with a connect screen.
    SelectAndConnect {
        network: CaipNetwork,
        next: Option<ConnectView>,
    },
    None,
}

/// Snapshot of everything the picker looks at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkSelection {
    pub caip_network: Option<CaipNetworkId>,
    pub approved_caip_network_ids: Option<Vec<CaipNetworkId>>,
    pub supports_all_networks: bool,
    pub active_chain: Option<ChainNamespace>,
    pub connected_chains: Vec<ChainNamespace>,
    pub wallet_id: Option<String>,
    pub connector_id: Option<String>,
    pub no_adapters: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkListItem {
    pub network: CaipNetwork,
    pub selected: bool,
    pub disabled: bool,
}

impl NetworkSelection {
    pub fn new(state: &AppKitState, storage: &dyn Storage) -> Self {
        let mut connected_chains: Vec<ChainNamespace> = state
            .accounts
            .iter()
            .filter(|(_, account)| account.is_connected)
            .map(|(chain, _)| chain.clone())
            .collect();
        connected_chains.sort();

        Self {
            caip_network: state.network.caip_network.as_ref().map(|n| n.id.clone()),
            approved_caip_network_ids: state.network.approved_caip_network_ids.clone(),
            supports_all_networks: state.network.supports_all_networks,
            active_chain: state.active_chain.clone(),
            connected_chains,
            wallet_id: storage.get_item(WALLET_ID),
            connector_id: storage.get_item(CONNECTED_CONNECTOR),
            no_adapters: false,
        }
    }

    pub fn with_no_adapters(mut self, no_adapters: bool) -> Self {
        self.no_adapters = no_adapters;
        self
    }

    fn wallet_id_is_walletconnect(&self) -> bool {
        self.wallet_id.as_deref() == Some(WALLET_CONNECT_CONNECTOR_ID)
    }

    /// The connector id is persisted either as the connector id or as the
    /// connector type.
    fn is_walletconnect(&self) -> bool {
        self.wallet_id_is_walletconnect()
            || self.connector_id.as_deref().is_some_and(|id| {
                id == WALLET_CONNECT_CONNECTOR_ID
                    || matches!(
                        serde_plain::from_str(id),
                        Ok(ConnectorType::WalletConnect)
                    )
            })
    }

    fn is_approved(&self, id: &CaipNetworkId) -> bool {
        self.approved_caip_network_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(id))
    }

    /// Whether the account of the active namespace is connected.
    pub fn is_connected(&self) -> bool {
        match &self.active_chain {
            Some(chain) => self.connected_chains.contains(chain),
            None => !self.connected_chains.is_empty(),
        }
    }

    pub fn is_chain_connected(&self, chain: &ChainNamespace) -> bool {
        self.connected_chains.contains(chain)
    }

    /// WalletConnect sessions are limited to the approved networks. Other
    /// wallets only restrict networks of the namespace they are on.
    pub fn is_network_disabled(&self, network: &CaipNetwork) -> bool {
        if self.supports_all_networks || self.is_approved(&network.id) {
            return false;
        }
        self.is_walletconnect()
            || self.active_chain.as_ref() == Some(&network.chain_namespace)
    }

    pub fn network_switch_action(&self, network: &CaipNetwork) -> NetworkSwitchAction {
        let chain_connected = self.is_chain_connected(&network.chain_namespace);

        if !self.is_connected() {
            let next = match (chain_connected, self.no_adapters) {
                (true, _) => None,
                (false, true) => Some(ConnectView::ConnectingWalletConnect),
                (false, false) => Some(ConnectView::Connect),
            };
            return NetworkSwitchAction::SelectAndConnect {
                network: network.clone(),
                next,
            };
        }

        if self.caip_network.as_ref() == Some(&network.id) {
            return NetworkSwitchAction::None;
        }

        if !chain_connected && !self.wallet_id_is_walletconnect() {
            NetworkSwitchAction::SwitchActiveChain {
                switch_to_chain: network.chain_namespace.clone(),
                network: network.clone(),
            }
        } else if self.is_approved(&network.id) || self.is_walletconnect() {
            NetworkSwitchAction::Switch(network.clone())
        } else if self.supports_all_networks {
            NetworkSwitchAction::PromptSwitch(network.clone())
        } else {
            NetworkSwitchAction::Switch(network.clone())
        }
    }

    /// Sorted, filtered picker entries.
    pub fn list_networks(
        &self,
        requested: &[CaipNetwork],
        search: &str,
    ) -> Vec<NetworkListItem> {
        let sorted =
            sort_requested_networks(self.approved_caip_network_ids.as_deref(), requested);
        filter_networks(&sorted, search)
            .into_iter()
            .map(|network| NetworkListItem {
                selected: self.caip_network.as_ref() == Some(&network.id),
                disabled: self.is_network_disabled(&network),
                network,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appkit::{AppKit, ApprovedCaipNetworksData};
    use crate::chain::{ethereum, polygon, sepolia, solana};
    use crate::storage::MemoryStorage;

    fn evm(chain: crate::chain::Chain) -> CaipNetwork {
        chain.to_caip_network(ChainNamespace::Eip155, None)
    }

    fn requested() -> Vec<CaipNetwork> {
        vec![evm(ethereum()), evm(polygon()), evm(sepolia())]
    }

    fn connected_on_ethereum() -> NetworkSelection {
        NetworkSelection {
            caip_network: Some(CaipNetworkId::eip155(1)),
            approved_caip_network_ids: Some(vec![CaipNetworkId::eip155(1)]),
            supports_all_networks: false,
            active_chain: Some(ChainNamespace::Eip155),
            connected_chains: vec![ChainNamespace::Eip155],
            ..Default::default()
        }
    }

    fn ids(networks: &[CaipNetwork]) -> Vec<String> {
        networks.iter().map(|n| n.id.to_string()).collect()
    }

    #[test]
    fn test_sort_requested_networks() {
        let approved = vec![CaipNetworkId::eip155(11155111), CaipNetworkId::eip155(1)];
        let sorted = sort_requested_networks(Some(&approved), &requested());
        assert_eq!(ids(&sorted), vec!["eip155:11155111", "eip155:1", "eip155:137"]);

        let sorted = sort_requested_networks(None, &requested());
        assert_eq!(ids(&sorted), vec!["eip155:1", "eip155:137", "eip155:11155111"]);
    }

    #[test]
    fn test_filter_networks() {
        assert_eq!(filter_networks(&requested(), "").len(), 3);
        assert_eq!(ids(&filter_networks(&requested(), "POLY")), vec!["eip155:137"]);

        let mut unnamed = evm(ethereum());
        unnamed.name = None;
        assert!(filter_networks(&[unnamed], "eth").is_empty());
    }

    #[test]
    fn test_is_network_disabled() {
        let selection = connected_on_ethereum();
        assert!(!selection.is_network_disabled(&evm(ethereum())));
        assert!(selection.is_network_disabled(&evm(polygon())));
        // another namespace stays selectable for injected wallets
        let solana = solana().to_caip_network(ChainNamespace::Solana, None);
        assert!(!selection.is_network_disabled(&solana));

        let walletconnect = NetworkSelection {
            connector_id: Some("WALLET_CONNECT".to_string()),
            ..connected_on_ethereum()
        };
        assert!(walletconnect.is_network_disabled(&solana));

        let all = NetworkSelection {
            supports_all_networks: true,
            ..connected_on_ethereum()
        };
        assert!(!all.is_network_disabled(&evm(polygon())));
    }

    #[test]
    fn test_switch_actions_when_connected() {
        let selection = connected_on_ethereum();
        assert_eq!(
            selection.network_switch_action(&evm(ethereum())),
            NetworkSwitchAction::None
        );
        assert_eq!(
            selection.network_switch_action(&evm(polygon())),
            NetworkSwitchAction::Switch(evm(polygon()))
        );

        let solana = solana().to_caip_network(ChainNamespace::Solana, None);
        assert_eq!(
            selection.network_switch_action(&solana),
            NetworkSwitchAction::SwitchActiveChain {
                switch_to_chain: ChainNamespace::Solana,
                network: solana.clone(),
            }
        );

        let all = NetworkSelection {
            supports_all_networks: true,
            ..connected_on_ethereum()
        };
        assert_eq!(
            all.network_switch_action(&evm(polygon())),
            NetworkSwitchAction::PromptSwitch(evm(polygon()))
        );

        let walletconnect = NetworkSelection {
            supports_all_networks: true,
            wallet_id: Some("walletConnect".to_string()),
            ..connected_on_ethereum()
        };
        assert_eq!(
            walletconnect.network_switch_action(&solana),
            NetworkSwitchAction::Switch(solana)
        );
    }

    #[test]
    fn test_switch_actions_when_disconnected() {
        let selection = NetworkSelection::default();
        assert_eq!(
            selection.network_switch_action(&evm(polygon())),
            NetworkSwitchAction::SelectAndConnect {
                network: evm(polygon()),
                next: Some(ConnectView::Connect),
            }
        );
        assert_eq!(
            selection
                .with_no_adapters(true)
                .network_switch_action(&evm(polygon())),
            NetworkSwitchAction::SelectAndConnect {
                network: evm(polygon()),
                next: Some(ConnectView::ConnectingWalletConnect),
            }
        );

        // solana connected while the active view is on eip155
        let selection = NetworkSelection {
            active_chain: Some(ChainNamespace::Eip155),
            connected_chains: vec![ChainNamespace::Solana],
            ..Default::default()
        };
        let solana = solana().to_caip_network(ChainNamespace::Solana, None);
        assert_eq!(
            selection.network_switch_action(&solana),
            NetworkSwitchAction::SelectAndConnect {
                network: solana,
                next: None,
            }
        );
    }

    #[test]
    fn test_selection_from_appkit() {
        let appkit = AppKit::new();
        appkit.set_caip_network(Some(evm(polygon())));
        appkit.set_is_connected(true, &ChainNamespace::Eip155);
        appkit.set_approved_caip_networks_data(ApprovedCaipNetworksData {
            approved_caip_network_ids: Some(vec![CaipNetworkId::eip155(137)]),
            supports_all_networks: false,
        });
        let storage = MemoryStorage::new();
        storage.set_item(CONNECTED_CONNECTOR, "walletConnect");

        let selection = NetworkSelection::new(&appkit.state(), &storage);
        assert!(selection.is_connected());
        assert_eq!(selection.active_chain, Some(ChainNamespace::Eip155));

        let items = selection.list_networks(&requested(), "");
        assert_eq!(items[0].network.id, CaipNetworkId::eip155(137));
        assert!(items[0].selected && !items[0].disabled);
        assert!(items[1..].iter().all(|i| i.disabled && !i.selected));
    }
}
