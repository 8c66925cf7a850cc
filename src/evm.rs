/// EVM client
///
/// EIP-1193 counterpart of the Solana client for `eip155` chains. Talks to
/// an injected provider, to providers announced over EIP-6963 or to a
/// WalletConnect session, and keeps [`AppKit`] in sync the same way.
///
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};

use alloy::hex;
use alloy::primitives::{Address, U256, keccak256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::appkit::{AppKit, ApprovedCaipNetworksData};
use crate::caip::{
    CaipAddress, CaipNetworkId, ChainNamespace, parse_caip_network_id,
};
use crate::chain::{CaipNetwork, Chain, detect_rpc_url, get_chain_from_caip};
use crate::connector::{Connector, ConnectorType, ProviderEvent, WalletProvider};
use crate::constants::{
    CONNECTED_CONNECTOR, EVM_CAIP_CHAIN_ID, INJECTED_CONNECTOR_ID,
    UNRECOGNIZED_CHAIN_CODE, WALLET_CONNECT_CONNECTOR_ID,
    WALLET_CONNECT_EXPLORER_ID, WALLET_CONNECT_IMAGE_URL, WEI_DECIMALS,
};
use crate::controller::{
    ConnectExternalOptions, ConnectionControllerClient, NetworkControllerClient,
    OnUri, SendTransactionArgs, WriteContractArgs,
};
use crate::error::{Error, Result};
use crate::options::AppKitOptions;
use crate::rpc::{
    Balance, ChainRpc, RpcConnection, format_units, parse_quantity, parse_units,
};
use crate::storage::Storage;
use crate::store::{ConnectionState, ConnectionStore};
use crate::walletconnect::{
    UniversalProvider, WalletConnectConnector, WalletConnectConnectorOptions,
    validate_display_uri,
};

const CHAIN: ChainNamespace = ChainNamespace::Eip155;

/// Provider details announced with an `eip6963:announceProvider` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip6963ProviderInfo {
    pub uuid: String,
    pub name: String,
    pub icon: String,
    pub rdns: String,
}

#[derive(Clone)]
pub struct AnnouncedProvider {
    pub info: Eip6963ProviderInfo,
    pub provider: Arc<dyn WalletProvider>,
}

/// Chain ids arrive as hex quantities (`0x89`), decimals (`137`) or CAIP-2
/// ids (`eip155:137`) depending on the wallet.
pub fn parse_chain_id(value: &str) -> Result<u64> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        return Ok(u64::from_str_radix(hex, 16)?);
    }
    if value.contains(':') {
        return parse_caip_network_id(value)?
            .eip155_chain_id()
            .ok_or_else(|| Error::InvalidCaipNetworkId(value.to_string()));
    }
    Ok(value.parse()?)
}

/// EIP-55 checksummed form of `address`.
pub fn checksum_address(address: &str) -> Result<String> {
    let address = Address::from_str(address)
        .map_err(|_| Error::InvalidAddress(address.to_string()))?;
    Ok(address.to_checksum(None))
}

pub struct EvmClient {
    this: Weak<EvmClient>,
    chains: Vec<Chain>,
    chain_images: HashMap<String, String>,
    project_id: String,
    appkit: OnceLock<Arc<AppKit>>,
    walletconnect: OnceLock<Arc<WalletConnectConnector>>,
    store: ConnectionStore,
    storage: Arc<dyn Storage>,
    injected: Option<Arc<dyn WalletProvider>>,
    announced: RwLock<Vec<AnnouncedProvider>>,
    eip6963_enabled: AtomicBool,
    rpc: RwLock<Option<Arc<dyn ChainRpc>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    has_synced_connected_account: AtomicBool,
}

impl EvmClient {
    /// `injected` is the provider the environment exposes directly (the
    /// browser's `window.ethereum`), if any.
    pub fn new(
        options: AppKitOptions,
        storage: Arc<dyn Storage>,
        injected: Option<Arc<dyn WalletProvider>>,
    ) -> Result<Arc<Self>> {
        if options.chains.is_empty() {
            return Err(Error::MissingOption("EvmClient:constructor - chains"));
        }

        let stored = storage.get_item(EVM_CAIP_CHAIN_ID);
        let chain = match (&stored, &options.default_chain) {
            (None, Some(default)) => Some(default.clone()),
            _ => get_chain_from_caip(&options.chains, stored.as_deref()).cloned(),
        };

        let store = ConnectionStore::new();
        if let Some(chain) = &chain {
            store.set_current_chain(Some(chain.clone()));
            store.set_caip_chain_id(Some(chain.caip_network_id(CHAIN)));
            store.set_connection(Some(RpcConnection::new(
                detect_rpc_url(chain, &CHAIN, &options.project_id)?,
                options.connection_settings,
            )));
        }

        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            eip6963_enabled: AtomicBool::new(options.eip6963_enabled()),
            chains: options.chains,
            chain_images: options.chain_images,
            project_id: options.project_id,
            appkit: OnceLock::new(),
            walletconnect: OnceLock::new(),
            store,
            storage,
            injected,
            announced: RwLock::new(vec![]),
            rpc: RwLock::new(None),
            watcher: Mutex::new(None),
            has_synced_connected_account: AtomicBool::new(false),
        }))
    }

    pub async fn construct(
        &self,
        appkit: Arc<AppKit>,
        options: &AppKitOptions,
        universal_provider: Option<Arc<dyn UniversalProvider>>,
    ) -> Result<()> {
        if options.project_id.is_empty() {
            return Err(Error::MissingOption("Evm:construct - projectId"));
        }
        let _ = self.appkit.set(appkit.clone());

        if let (Some(provider), Some(metadata)) =
            (universal_provider, options.metadata.clone())
        {
            let connector = WalletConnectConnector::new(
                WalletConnectConnectorOptions {
                    project_id: options.project_id.clone(),
                    relay_url: options.relay_url().to_string(),
                    metadata,
                    chains: self.chains.clone(),
                    qrcode: true,
                },
                CHAIN,
                provider,
            );
            let _ = self.walletconnect.set(Arc::new(connector));
        }

        self.eip6963_enabled
            .store(options.eip6963_enabled(), Ordering::SeqCst);
        appkit.set_eip6963_enabled(options.eip6963_enabled());

        self.sync_requested_networks();
        self.sync_network().await;
        self.check_active_providers().await;
        self.sync_connectors();
        Ok(())
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    pub fn walletconnect(&self) -> Option<Arc<WalletConnectConnector>> {
        self.walletconnect.get().cloned()
    }

    pub fn get_address(&self) -> Option<String> {
        self.store.state().address.filter(|a| !a.is_empty())
    }

    pub fn get_chain_id(&self) -> Option<u64> {
        self.store
            .state()
            .caip_chain_id
            .and_then(|id| id.eip155_chain_id())
    }

    pub fn get_wallet_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.store.provider()
    }

    pub fn get_wallet_provider_type(&self) -> Option<String> {
        self.store.state().provider_type
    }

    pub fn subscribe_provider(
        &self,
    ) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.store.subscribe()
    }

    pub fn set_rpc(&self, rpc: Arc<dyn ChainRpc>) {
        if let Ok(mut slot) = self.rpc.write() {
            *slot = Some(rpc);
        }
    }

    fn appkit(&self) -> Option<&Arc<AppKit>> {
        self.appkit.get()
    }

    fn chain_rpc(&self) -> Option<Arc<dyn ChainRpc>> {
        if let Some(rpc) = self.rpc.read().ok().and_then(|r| r.clone()) {
            return Some(rpc);
        }
        let connection = self.store.state().connection?;
        Some(Arc::new(connection.client()))
    }

    fn record_error(&self, error: &Error) {
        log::warn!("evm client: {error}");
        self.store.set_error(Some(error.to_string()));
    }

    /// The CAIP-10 account embeds the chain id, so a chain switch resyncs
    /// a connected account as well.
    async fn react(&self, before: &ConnectionState) {
        let after = self.store.state();
        let chain_changed = before.caip_chain_id != after.caip_chain_id;
        if chain_changed {
            // sync_account below reads the balance
            self.apply_network();
        }
        if before.address != after.address
            || before.is_connected != after.is_connected
            || (chain_changed && after.is_connected)
        {
            self.sync_account().await;
        }
    }

    // -- EIP-6963 --------------------------------------------------------

    /// Registers a provider announced over EIP-6963. Ignored when discovery
    /// is disabled; a repeated announcement replaces the earlier one.
    pub fn add_announced_provider(
        &self,
        info: Eip6963ProviderInfo,
        provider: Arc<dyn WalletProvider>,
    ) {
        if !self.eip6963_enabled.load(Ordering::SeqCst) {
            log::debug!("eip6963 disabled, ignoring {}", info.rdns);
            return;
        }
        if let Ok(mut announced) = self.announced.write() {
            announced.retain(|a| a.info.uuid != info.uuid);
            announced.push(AnnouncedProvider { info, provider });
        }
        self.sync_connectors();
    }

    fn find_provider(&self, id: &str) -> Option<Arc<dyn WalletProvider>> {
        if id == INJECTED_CONNECTOR_ID {
            return self.injected.clone().filter(|p| p.is_installed());
        }
        self.announced
            .read()
            .ok()?
            .iter()
            .find(|a| a.info.rdns == id || a.info.uuid == id)
            .map(|a| a.provider.clone())
    }

    pub fn sync_connectors(&self) {
        let mut connectors = vec![Connector {
            id: WALLET_CONNECT_CONNECTOR_ID.to_string(),
            explorer_id: Some(WALLET_CONNECT_EXPLORER_ID.to_string()),
            connector_type: ConnectorType::WalletConnect,
            image_url: Some(WALLET_CONNECT_IMAGE_URL.to_string()),
            name: self.walletconnect().map(|wc| wc.name().to_string()),
            chain: CHAIN,
        }];

        if let Some(injected) = self.injected.as_ref().filter(|p| p.is_installed()) {
            connectors.push(Connector {
                id: INJECTED_CONNECTOR_ID.to_string(),
                explorer_id: None,
                connector_type: ConnectorType::Injected,
                image_url: None,
                name: Some(injected.name()),
                chain: CHAIN,
            });
        }

        if let Ok(announced) = self.announced.read() {
            connectors.extend(announced.iter().map(|a| Connector {
                id: a.info.rdns.clone(),
                explorer_id: None,
                connector_type: ConnectorType::Announced,
                image_url: Some(a.info.icon.clone()),
                name: Some(a.info.name.clone()),
                chain: CHAIN,
            }));
        }

        if let Some(appkit) = self.appkit() {
            appkit.set_connectors(connectors);
        }
    }

    // -- Sync ------------------------------------------------------------

    pub async fn check_active_providers(&self) {
        let Some(connector_id) = self.storage.get_item(CONNECTED_CONNECTOR) else {
            return;
        };
        let result = if connector_id == WALLET_CONNECT_CONNECTOR_ID {
            self.restore_walletconnect().await
        } else {
            self.connect_external(ConnectExternalOptions {
                id: connector_id,
                chain_id: None,
            })
            .await
        };
        if let Err(e) = result {
            self.record_error(&e);
        }
    }

    async fn restore_walletconnect(&self) -> Result<()> {
        let Some(wc) = self.walletconnect() else {
            return Ok(());
        };
        let chain_id = self.current_chain_id();
        let address = wc.connect(true, &chain_id).await?;
        self.set_walletconnect_provider(address).await
    }

    fn current_chain_id(&self) -> String {
        self.store
            .state()
            .current_chain
            .map(|c| c.chain_id)
            .unwrap_or_default()
    }

    pub async fn sync_account(&self) {
        let state = self.store.state();
        let Some(appkit) = self.appkit() else {
            return;
        };
        appkit.reset_account(&CHAIN);

        let address = state.address.filter(|a| !a.is_empty());
        match (state.is_connected, address, state.caip_chain_id) {
            (true, Some(address), Some(caip_chain_id)) => {
                appkit.set_is_connected(true, &CHAIN);
                appkit.set_caip_address(
                    Some(caip_chain_id.with_address(address.clone())),
                    &CHAIN,
                );
                let explorer_url = state
                    .current_chain
                    .filter(|c| c.chain_id == caip_chain_id.reference)
                    .and_then(|c| c.account_explorer_url(&address));
                appkit.set_address_explorer_url(explorer_url, &CHAIN);
                self.sync_balance(&address).await;
                self.has_synced_connected_account
                    .store(true, Ordering::SeqCst);
            }
            (false, _, _)
                if self.has_synced_connected_account.load(Ordering::SeqCst) =>
            {
                appkit.reset_wc_connection();
                appkit.reset_network();
            }
            _ => {}
        }
    }

    pub async fn sync_balance(&self, address: &str) {
        let state = self.store.state();
        let chain = state.current_chain.filter(|c| {
            state
                .caip_chain_id
                .as_ref()
                .is_some_and(|id| id.reference == c.chain_id)
        });
        let Some(chain) = chain else {
            if let Some(appkit) = self.appkit() {
                appkit.set_balance(None, None, &CHAIN);
            }
            self.store.set_balance(None);
            return;
        };
        let Some(rpc) = self.chain_rpc() else {
            return;
        };
        let commitment = Default::default();
        match rpc.get_balance(&CHAIN, address, commitment).await {
            Ok(wei) => {
                let balance = Balance::new(wei, WEI_DECIMALS, chain.currency.clone());
                if let Some(appkit) = self.appkit() {
                    appkit.set_balance(
                        Some(balance.formatted()),
                        Some(chain.currency.clone()),
                        &CHAIN,
                    );
                }
                self.store.set_balance(Some(balance));
            }
            Err(e) => self.record_error(&e),
        }
    }

    pub fn sync_requested_networks(&self) {
        let networks = self
            .chains
            .iter()
            .map(|c| c.to_caip_network(CHAIN, Some(&self.chain_images)))
            .collect();
        if let Some(appkit) = self.appkit() {
            appkit.set_requested_caip_networks(networks, &CHAIN);
        }
    }

    pub async fn sync_network(&self) {
        if let Some(address) = self.apply_network() {
            if self.has_synced_connected_account.load(Ordering::SeqCst) {
                self.sync_balance(&address).await;
            }
        }
    }

    /// Publishes the active network. Returns the connected address, if any.
    fn apply_network(&self) -> Option<String> {
        let state = self.store.state();
        let caip_chain_id = state.caip_chain_id.as_ref().map(ToString::to_string);
        let chain = get_chain_from_caip(&self.chains, caip_chain_id.as_deref())?;
        let appkit = self.appkit()?;

        // Wallets may sit on a chain the dApp never configured
        let configured = state
            .caip_chain_id
            .as_ref()
            .is_none_or(|id| id.reference == chain.chain_id);
        let network = match &state.caip_chain_id {
            Some(id) if !configured => CaipNetwork {
                id: id.clone(),
                name: None,
                image_id: None,
                image_url: None,
                chain_namespace: CHAIN,
            },
            _ => chain.to_caip_network(CHAIN, Some(&self.chain_images)),
        };
        appkit.set_caip_network(Some(network));

        let address = state.address.filter(|a| !a.is_empty());
        match (state.is_connected, address) {
            (true, Some(address)) => {
                let explorer_url = configured
                    .then(|| chain.account_explorer_url(&address))
                    .flatten();
                appkit.set_address_explorer_url(explorer_url, &CHAIN);
                Some(address)
            }
            _ => None,
        }
    }

    /// Points the store at `chain_id`, the wallet already switched.
    async fn set_chain(&self, chain_id: u64) -> Result<()> {
        let caip_chain_id = CaipNetworkId::eip155(chain_id);
        let chain = self
            .chains
            .iter()
            .find(|c| c.chain_id == chain_id.to_string());
        let connection = match chain {
            Some(chain) => Some(RpcConnection::new(
                detect_rpc_url(chain, &CHAIN, &self.project_id)?,
                Default::default(),
            )),
            None => None,
        };

        let before = self.store.state();
        self.store.set_caip_chain_id(Some(caip_chain_id.clone()));
        // Unconfigured chains have no RPC or currency to read balances with
        self.store.set_current_chain(chain.cloned());
        self.store.set_connection(connection);
        self.storage
            .set_item(EVM_CAIP_CHAIN_ID, &caip_chain_id.to_string());
        self.react(&before).await;
        Ok(())
    }

    /// Asks the wallet to switch to `network`, adding the chain first when
    /// the wallet does not know it (EIP-3085).
    pub async fn switch_network(&self, network: &CaipNetwork) -> Result<()> {
        let chain_id = network
            .id
            .eip155_chain_id()
            .ok_or_else(|| Error::InvalidCaipNetworkId(network.id.to_string()))?;
        let chain = self
            .chains
            .iter()
            .find(|c| c.chain_id == network.id.reference)
            .ok_or_else(|| Error::ChainNotFound(network.id.to_string()))?;

        if let Some(provider) = self.store.provider() {
            let hex_chain_id = format!("0x{chain_id:x}");
            let switched = provider
                .request(
                    "wallet_switchEthereumChain",
                    json!([{ "chainId": hex_chain_id }]),
                )
                .await
                .map_err(Error::from);

            match switched {
                Ok(_) => {}
                Err(e) if e.rpc_code() == Some(UNRECOGNIZED_CHAIN_CODE) => {
                    log::info!("adding chain {chain_id} to the wallet");
                    provider
                        .request(
                            "wallet_addEthereumChain",
                            json!([{
                                "chainId": hex_chain_id,
                                "chainName": chain.name,
                                "nativeCurrency": {
                                    "name": chain.currency,
                                    "symbol": chain.currency,
                                    "decimals": WEI_DECIMALS,
                                },
                                "rpcUrls": [chain.rpc_url],
                                "blockExplorerUrls": chain.explorer_url.iter().collect::<Vec<_>>(),
                            }]),
                        )
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }

        self.set_chain(chain_id).await
    }

    // -- Providers -------------------------------------------------------

    pub async fn set_walletconnect_provider(&self, address: String) -> Result<()> {
        let wc = self
            .walletconnect()
            .ok_or(Error::ProviderNotFound("setWalletConnectProvider"))?;
        let before = self.store.state();

        // The wallet picks the active chain from the session's first account
        let chain_id = wc
            .get_provider()
            .session()
            .and_then(|ns| ns.get(CHAIN.as_str()).cloned())
            .and_then(|ns| ns.accounts)
            .and_then(|accounts| accounts.first().cloned())
            .and_then(|account| account.parse::<CaipAddress>().ok())
            .and_then(|account| account.network.eip155_chain_id());

        self.store.set_is_connected(true);
        self.store
            .set_provider_type(Some(WALLET_CONNECT_CONNECTOR_ID.to_string()));
        let provider: Arc<dyn WalletProvider> = wc;
        self.store.set_provider(Some(provider.clone()));
        self.store.set_address(Some(checksum_address(&address)?));
        self.storage
            .set_item(CONNECTED_CONNECTOR, WALLET_CONNECT_CONNECTOR_ID);
        self.watch_provider(provider);
        self.react(&before).await;

        if let Some(chain_id) = chain_id {
            self.set_chain(chain_id).await?;
        }

        let approved = self.get_approved_caip_networks_data().await?;
        if let Some(appkit) = self.appkit() {
            appkit.set_approved_caip_networks_data(approved);
        }
        Ok(())
    }

    pub async fn set_injected_provider(
        &self,
        provider: Arc<dyn WalletProvider>,
        connector_id: &str,
        address: String,
        chain_id: Option<u64>,
    ) -> Result<()> {
        let address = checksum_address(&address)?;
        let before = self.store.state();

        self.store.set_is_connected(true);
        self.store.set_provider_type(Some(connector_id.to_string()));
        self.store.set_provider(Some(provider.clone()));
        self.store.set_address(Some(address));
        self.storage.set_item(CONNECTED_CONNECTOR, connector_id);
        self.watch_provider(provider);
        self.react(&before).await;

        if let Some(chain_id) = chain_id {
            self.set_chain(chain_id).await?;
        }
        Ok(())
    }

    fn watch_provider(&self, provider: Arc<dyn WalletProvider>) {
        let this = self.this.clone();
        let mut events = provider.events();
        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("missed {n} provider events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(client) = this.upgrade() else {
                    break;
                };
                if !client.handle_provider_event(event).await {
                    break;
                }
            }
        });

        if let Ok(mut watcher) = self.watcher.lock() {
            if let Some(previous) = watcher.replace(handle) {
                previous.abort();
            }
        }
    }

    fn reset(&self) {
        self.storage.remove_item(CONNECTED_CONNECTOR);
        self.store.reset();
    }

    /// Applies one EIP-1193 event. Returns `false` once the provider
    /// disconnected.
    pub async fn handle_provider_event(&self, event: ProviderEvent) -> bool {
        let before = self.store.state();
        let keep_listening = match event {
            ProviderEvent::Disconnect => {
                self.reset();
                false
            }
            ProviderEvent::AccountsChanged(Some(address))
            | ProviderEvent::Connect(address)
                if !address.is_empty() =>
            {
                // WalletConnect sessions report CAIP-10 accounts
                let address = match address.parse::<CaipAddress>() {
                    Ok(account) => account.address,
                    Err(_) => address,
                };
                match checksum_address(&address) {
                    Ok(address) => {
                        self.store.set_address(Some(address));
                    }
                    Err(e) => self.record_error(&e),
                }
                true
            }
            ProviderEvent::AccountsChanged(_) | ProviderEvent::Connect(_) => {
                self.reset();
                true
            }
            ProviderEvent::ChainChanged(chain_id) => {
                // set_chain runs its own reactions
                let result = match parse_chain_id(&chain_id) {
                    Ok(chain_id) => self.set_chain(chain_id).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    self.record_error(&e);
                }
                return true;
            }
            ProviderEvent::DisplayUri(_) => true,
        };
        self.react(&before).await;
        keep_listening
    }

    fn provider(&self, ctx: &'static str) -> Result<Arc<dyn WalletProvider>> {
        self.store.provider().ok_or(Error::ProviderNotFound(ctx))
    }

    fn handle_display_uri(&self, uri: String, on_uri: &OnUri) {
        match validate_display_uri(&uri) {
            Ok(_) => {
                if let Some(appkit) = self.appkit() {
                    appkit.set_wc_uri(Some(uri.clone()));
                }
                on_uri(uri);
            }
            Err(e) => log::warn!("dropping display_uri: {e}"),
        }
    }

    fn transaction_params(&self, args: &SendTransactionArgs) -> Result<Value> {
        let from = self.get_address().ok_or(Error::NotConnected)?;
        let mut tx = json!({
            "from": from,
            "to": args.to,
            "value": format!("0x{:x}", args.value),
        });
        if let Some(data) = &args.data {
            tx["data"] = json!(data);
        }
        if let Some(gas) = args.gas {
            tx["gas"] = json!(format!("0x{gas:x}"));
        }
        if let Some(gas_price) = args.gas_price {
            tx["gasPrice"] = json!(format!("0x{gas_price:x}"));
        }
        Ok(tx)
    }
}

/// Calldata of an ERC-20 `transfer(address,uint256)`.
pub fn erc20_transfer_data(to: &str, amount: U256) -> Result<String> {
    let to = Address::from_str(to).map_err(|_| Error::InvalidAddress(to.to_string()))?;
    let mut data = keccak256("transfer(address,uint256)")[..4].to_vec();
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_slice());
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    Ok(hex::encode_prefixed(data))
}

#[async_trait]
impl NetworkControllerClient for EvmClient {
    async fn switch_caip_network(&self, network: Option<CaipNetwork>) -> Result<()> {
        let Some(network) = network else {
            return Ok(());
        };
        self.switch_network(&network).await.inspect_err(|e| {
            self.record_error(e);
        })
    }

    async fn get_approved_caip_networks_data(
        &self,
    ) -> Result<ApprovedCaipNetworksData> {
        let provider_type = self.store.state().provider_type;
        if provider_type.as_deref() == Some(WALLET_CONNECT_CONNECTOR_ID) {
            if let Some(wc) = self.walletconnect() {
                return Ok(ApprovedCaipNetworksData {
                    approved_caip_network_ids: wc.approved_caip_network_ids(),
                    supports_all_networks: false,
                });
            }
        }
        Ok(ApprovedCaipNetworksData {
            approved_caip_network_ids: None,
            supports_all_networks: true,
        })
    }
}

#[async_trait]
impl ConnectionControllerClient for EvmClient {
    async fn connect_walletconnect(&self, on_uri: OnUri) -> Result<()> {
        let wc = self.walletconnect().ok_or(Error::ProviderNotFound(
            "connectionControllerClient:getWalletConnectUri",
        ))?;
        let chain_id = self.current_chain_id();

        let mut events = wc.get_provider().events();
        let connect = wc.connect(false, &chain_id);
        tokio::pin!(connect);

        let mut listening = true;
        let address = loop {
            tokio::select! {
                result = &mut connect => break result?,
                event = events.recv(), if listening => match event {
                    Ok(ProviderEvent::DisplayUri(uri)) => {
                        self.handle_display_uri(uri, &on_uri);
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => listening = false,
                },
            }
        };
        while let Ok(event) = events.try_recv() {
            if let ProviderEvent::DisplayUri(uri) = event {
                self.handle_display_uri(uri, &on_uri);
            }
        }

        self.set_walletconnect_provider(address).await
    }

    async fn connect_external(&self, options: ConnectExternalOptions) -> Result<()> {
        let provider = self
            .find_provider(&options.id)
            .ok_or_else(|| Error::ConnectorNotFound(options.id.clone()))?;

        let accounts = provider.request("eth_requestAccounts", json!([])).await?;
        let address = accounts
            .as_array()
            .and_then(|a| a.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(Error::NotConnected)?;

        let chain_id = match options.chain_id {
            Some(chain_id) => Some(parse_chain_id(&chain_id)?),
            None => match provider.request("eth_chainId", json!([])).await? {
                Value::String(s) => Some(parse_chain_id(&s)?),
                Value::Number(n) => n.as_u64(),
                _ => None,
            },
        };

        self.set_injected_provider(provider, &options.id, address, chain_id)
            .await
    }

    async fn disconnect(&self) -> Result<()> {
        let before = self.store.state();
        let provider = self.store.provider();

        if before.provider_type.as_deref() == Some(WALLET_CONNECT_CONNECTOR_ID) {
            if let Some(wc) = self.walletconnect() {
                wc.get_provider().disconnect().await?;
            }
        } else if let Some(provider) = provider {
            provider.emit_disconnect();
        }

        self.reset();
        self.react(&before).await;
        Ok(())
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        let provider = self.provider("connectionControllerClient:signMessage")?;
        let address = self.get_address().ok_or(Error::NotConnected)?;
        let signature = provider
            .request(
                "personal_sign",
                json!([hex::encode_prefixed(message.as_bytes()), address]),
            )
            .await?;
        signature.as_str().map(str::to_string).ok_or_else(|| {
            Error::InternalError(format!("unexpected signature: {signature}"))
        })
    }

    async fn estimate_gas(&self, args: &SendTransactionArgs) -> Result<U256> {
        let provider = self.provider("connectionControllerClient:estimateGas")?;
        let gas = provider
            .request("eth_estimateGas", json!([self.transaction_params(args)?]))
            .await?;
        parse_quantity(gas.as_str().unwrap_or_default())
    }

    async fn send_transaction(&self, args: SendTransactionArgs) -> Result<String> {
        let provider = self.provider("connectionControllerClient:sendTransaction")?;
        let hash = provider
            .request("eth_sendTransaction", json!([self.transaction_params(&args)?]))
            .await?;
        hash.as_str().map(str::to_string).ok_or_else(|| {
            Error::InternalError(format!("unexpected transaction hash: {hash}"))
        })
    }

    async fn write_contract(&self, args: WriteContractArgs) -> Result<String> {
        if args.method != "transfer" {
            return Err(Error::InternalError(format!(
                "unsupported contract method: {}",
                args.method
            )));
        }
        let data = erc20_transfer_data(&args.receiver_address, args.token_amount)?;
        self.send_transaction(SendTransactionArgs {
            to: args.token_address,
            data: Some(data),
            ..Default::default()
        })
        .await
    }

    async fn get_ens_address(&self, value: &str) -> Result<Option<String>> {
        // Plain addresses resolve to themselves, names need an ENS resolver
        Ok(checksum_address(value).ok())
    }

    async fn get_ens_avatar(&self, _value: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn parse_units(&self, value: &str, decimals: u8) -> Result<U256> {
        parse_units(value, decimals)
    }

    fn format_units(&self, value: U256, decimals: u8) -> Result<String> {
        Ok(format_units(value, decimals))
    }
}
