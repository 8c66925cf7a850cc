/// Solana client
///
/// Connects Solana wallet adapters and WalletConnect sessions, mirrors the
/// connection into a [`ConnectionStore`] and pushes the derived account
/// and network state into [`AppKit`].
///
/// Store changes drive the rest: a new address or connection flag resyncs
/// the account, a new chain id resyncs the network. The client runs these
/// reactions itself right after each mutation.
///
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::appkit::{AppKit, ApprovedCaipNetworksData};
use crate::caip::{CaipAddress, CaipNetworkId, ChainNamespace};
use crate::chain::{CaipNetwork, Chain, detect_rpc_url, get_chain_from_caip};
use crate::connector::{
    AdapterFactory, AdapterKey, Connector, ConnectorType, ProviderEvent,
    WalletAdapters, WalletId, WalletProvider, parse_wallet_id,
    sync_injected_wallets, transform_wallet_id,
};
use crate::constants::{
    INJECTED_CONNECTOR_ID, LAMPORTS_DECIMALS, SOLANA_CAIP_CHAIN_ID,
    WALLET_CONNECT_CONNECTOR_ID, WALLET_CONNECT_EXPLORER_ID,
    WALLET_CONNECT_IMAGE_URL, WALLET_ID,
};
use crate::controller::{
    ConnectExternalOptions, ConnectionControllerClient, NetworkControllerClient,
    OnUri, SendTransactionArgs, WriteContractArgs,
};
use crate::error::{Error, Result};
use crate::options::{AppKitOptions, ProviderConfig};
use crate::rpc::{Balance, ChainRpc, RpcConnection};
use crate::storage::Storage;
use crate::store::{ConnectionState, ConnectionStore};
use crate::types::Commitment;
use crate::walletconnect::{
    UniversalProvider, WalletConnectConnector, WalletConnectConnectorOptions,
    validate_display_uri,
};

const CHAIN: ChainNamespace = ChainNamespace::Solana;

pub struct SolanaClient {
    this: Weak<SolanaClient>,
    chains: Vec<Chain>,
    chain_images: HashMap<String, String>,
    solana_config: ProviderConfig,
    connection_settings: Commitment,
    default_chain: Option<CaipNetwork>,
    project_id: OnceLock<String>,
    appkit: OnceLock<Arc<AppKit>>,
    walletconnect: OnceLock<Arc<WalletConnectConnector>>,
    store: ConnectionStore,
    storage: Arc<dyn Storage>,
    adapter_factory: AdapterFactory,
    adapters: RwLock<WalletAdapters>,
    rpc: RwLock<Option<Arc<dyn ChainRpc>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    has_synced_connected_account: AtomicBool,
}

impl SolanaClient {
    /// Restores the last selected chain from `storage` and opens an RPC
    /// connection to it. Fails when no Solana provider config is given.
    pub fn new(
        options: AppKitOptions,
        storage: Arc<dyn Storage>,
        adapter_factory: AdapterFactory,
    ) -> Result<Arc<Self>> {
        let solana_config = options
            .provider_config
            .clone()
            .ok_or(Error::MissingOption("web3modal:constructor - solanaConfig"))?;

        let stored = storage.get_item(SOLANA_CAIP_CHAIN_ID);
        let chain = match (&stored, &options.default_chain) {
            (None, Some(default)) => Some(default.clone()),
            _ => get_chain_from_caip(&options.chains, stored.as_deref()).cloned(),
        };

        let store = ConnectionStore::new();
        if let Some(chain) = &chain {
            store.set_current_chain(Some(chain.clone()));
            store.set_caip_chain_id(Some(chain.caip_network_id(CHAIN)));
            store.set_connection(Some(RpcConnection::new(
                detect_rpc_url(chain, &CHAIN, &solana_config.project_id)?,
                options.connection_settings,
            )));
        }

        let adapters = adapter_factory(None);
        let default_chain = chain
            .as_ref()
            .map(|c| c.to_caip_network(CHAIN, Some(&options.chain_images)));

        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            chains: options.chains,
            chain_images: options.chain_images,
            solana_config,
            connection_settings: options.connection_settings,
            default_chain,
            project_id: OnceLock::new(),
            appkit: OnceLock::new(),
            walletconnect: OnceLock::new(),
            store,
            storage,
            adapter_factory,
            adapters: RwLock::new(adapters),
            rpc: RwLock::new(None),
            watcher: Mutex::new(None),
            has_synced_connected_account: AtomicBool::new(false),
        }))
    }

    /// Attaches the client to `appkit`. A WalletConnect connector is set up
    /// when a universal provider is given and chains are configured.
    pub async fn construct(
        &self,
        appkit: Arc<AppKit>,
        options: &AppKitOptions,
        universal_provider: Option<Arc<dyn UniversalProvider>>,
    ) -> Result<()> {
        if options.project_id.is_empty() {
            return Err(Error::MissingOption("Solana:construct - projectId"));
        }

        let _ = self.project_id.set(options.project_id.clone());
        let _ = self.appkit.set(appkit.clone());

        if let Some(provider) = universal_provider {
            if !self.chains.is_empty() {
                let connector = WalletConnectConnector::new(
                    WalletConnectConnectorOptions {
                        project_id: options.project_id.clone(),
                        relay_url: options.relay_url().to_string(),
                        metadata: self.solana_config.metadata.clone(),
                        chains: self.chains.clone(),
                        qrcode: true,
                    },
                    CHAIN,
                    provider,
                );
                let _ = self.walletconnect.set(Arc::new(connector));
            }
        }

        self.sync_requested_networks();
        self.sync_network().await;
        appkit.set_eip6963_enabled(options.eip6963_enabled());

        self.check_active_providers().await;
        self.sync_connectors();
        log::info!("solana client constructed with {} chains", self.chains.len());
        Ok(())
    }

    // -- Getters ---------------------------------------------------------

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn default_chain(&self) -> Option<&CaipNetwork> {
        self.default_chain.as_ref()
    }

    pub fn walletconnect(&self) -> Option<Arc<WalletConnectConnector>> {
        self.walletconnect.get().cloned()
    }

    pub fn has_synced_connected_account(&self) -> bool {
        self.has_synced_connected_account.load(Ordering::SeqCst)
    }

    pub fn get_address(&self) -> Option<String> {
        self.store.state().address.filter(|a| !a.is_empty())
    }

    pub fn get_wallet_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.store.provider()
    }

    pub fn get_wallet_provider_type(&self) -> Option<String> {
        self.store.state().provider_type
    }

    pub fn get_wallet_connection(&self) -> Option<RpcConnection> {
        self.store.state().connection
    }

    pub fn subscribe_provider(&self) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.store.subscribe()
    }

    /// Replaces the HTTP RPC used for balance reads.
    pub fn set_rpc(&self, rpc: Arc<dyn ChainRpc>) {
        if let Ok(mut slot) = self.rpc.write() {
            *slot = Some(rpc);
        }
    }

    pub async fn set_address(&self, address: Option<String>) {
        let before = self.store.state();
        self.store.set_address(address);
        self.react(&before).await;
    }

    fn appkit(&self) -> Option<&Arc<AppKit>> {
        self.appkit.get()
    }

    fn project_id(&self) -> &str {
        self.project_id
            .get()
            .map(String::as_str)
            .unwrap_or(&self.solana_config.project_id)
    }

    fn adapter(&self, key: AdapterKey) -> Option<Arc<dyn WalletProvider>> {
        self.adapters.read().ok()?.get(&key).cloned()
    }

    fn chain_rpc(&self) -> Option<Arc<dyn ChainRpc>> {
        if let Some(rpc) = self.rpc.read().ok().and_then(|r| r.clone()) {
            return Some(rpc);
        }
        let connection = self.store.state().connection?;
        Some(Arc::new(connection.client()))
    }

    fn connection_for(&self, chain: &Chain) -> Result<RpcConnection> {
        Ok(RpcConnection::new(
            detect_rpc_url(chain, &CHAIN, self.project_id())?,
            self.connection_settings,
        ))
    }

    /// Runs the reactions for whatever changed since `before`. The CAIP-10
    /// account embeds the chain, so a chain switch resyncs a connected
    /// account too.
    async fn react(&self, before: &ConnectionState) {
        let after = self.store.state();
        let chain_changed = before.caip_chain_id != after.caip_chain_id;
        if before.address != after.address
            || before.is_connected != after.is_connected
            || (chain_changed && after.is_connected)
        {
            self.sync_account().await;
        }
        if chain_changed {
            // sync_account already read the balance
            self.apply_network();
        }
    }

    fn record_error(&self, error: &Error) {
        log::warn!("solana client: {error}");
        self.store.set_error(Some(error.to_string()));
    }

    // -- Sync ------------------------------------------------------------

    /// Reconnects the wallet remembered in storage, if any.
    pub async fn check_active_providers(&self) {
        if let Err(e) = self.try_check_active_providers().await {
            self.record_error(&e);
        }
    }

    async fn try_check_active_providers(&self) -> Result<()> {
        let Some(wallet_id) = self.storage.get_item(WALLET_ID) else {
            return Ok(());
        };

        match parse_wallet_id(&wallet_id) {
            Some(WalletId::WalletConnect) => {
                let Some(wc) = self.walletconnect() else {
                    return Ok(());
                };
                let chain_id = self.current_chain_id().unwrap_or_default();
                wc.connect(true, &chain_id).await?;
                if let Some(address) = wc.enable().await? {
                    self.set_walletconnect_provider(Some(address)).await?;
                }
            }
            Some(WalletId::Injected(key)) => {
                if let Some(adapter) = self.adapter(key) {
                    if adapter.is_installed() {
                        let address = adapter.connect().await?;
                        let address = address.or_else(|| adapter.address());
                        self.set_injected_provider(adapter, key, address).await;
                    }
                }
            }
            None => log::debug!("ignoring stored wallet id {wallet_id}"),
        }
        Ok(())
    }

    fn current_chain_id(&self) -> Option<String> {
        self.store.state().current_chain.map(|c| c.chain_id)
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

        if let Ok(adapters) = self.adapters.read() {
            sync_injected_wallets(&mut connectors, &adapters, CHAIN);
        }

        if let Some(appkit) = self.appkit() {
            appkit.set_connectors(connectors);
        }
    }

    pub async fn sync_account(&self) {
        let state = self.store.state();
        let Some(appkit) = self.appkit() else {
            return;
        };

        appkit.reset_account(&CHAIN);

        let address = state.address.filter(|a| !a.is_empty());
        match (state.is_connected, address, state.current_chain) {
            (true, Some(address), Some(chain)) => {
                let caip_address: CaipAddress =
                    chain.caip_network_id(CHAIN).with_address(address.clone());
                appkit.set_is_connected(true, &CHAIN);
                appkit.set_caip_address(Some(caip_address), &CHAIN);
                appkit.set_address_explorer_url(
                    chain.account_explorer_url(&address),
                    &CHAIN,
                );
                self.sync_balance(&address).await;
                self.has_synced_connected_account
                    .store(true, Ordering::SeqCst);
            }
            (false, _, _) if self.has_synced_connected_account() => {
                appkit.reset_wc_connection();
                appkit.reset_network();
            }
            _ => {}
        }
    }

    pub async fn sync_balance(&self, address: &str) {
        let state = self.store.state();
        let caip_chain_id = state.caip_chain_id.map(|id| id.to_string());
        let Some(caip_chain_id) = caip_chain_id else {
            return;
        };
        let Some(chain) = get_chain_from_caip(&self.chains, Some(&caip_chain_id))
        else {
            return;
        };
        let Some(rpc) = self.chain_rpc() else {
            return;
        };

        match rpc.get_balance(&CHAIN, address, self.connection_settings).await {
            Ok(lamports) => {
                let balance =
                    Balance::new(lamports, LAMPORTS_DECIMALS, chain.currency.clone());
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
            if self.has_synced_connected_account() {
                self.sync_balance(&address).await;
            }
        }
    }

    /// Publishes the active network. Returns the connected address, if any.
    fn apply_network(&self) -> Option<String> {
        let state = self.store.state();
        let caip_chain_id = state.caip_chain_id.map(|id| id.to_string());
        let chain = get_chain_from_caip(&self.chains, caip_chain_id.as_deref())?;
        let appkit = self.appkit()?;

        appkit.set_caip_network(Some(
            chain.to_caip_network(CHAIN, Some(&self.chain_images)),
        ));

        let address = state.address.filter(|a| !a.is_empty());
        match (state.is_connected, address) {
            (true, Some(address)) => {
                appkit.set_address_explorer_url(
                    chain.account_explorer_url(&address),
                    &CHAIN,
                );
                Some(address)
            }
            _ => None,
        }
    }

    /// Moves the connection to `network`. Injected wallets keep their
    /// account; a WalletConnect session is re-proposed for the new chain.
    pub async fn switch_network(&self, network: &CaipNetwork) -> Result<()> {
        let id = network.id.to_string();
        let chain = get_chain_from_caip(&self.chains, Some(&id))
            .ok_or_else(|| Error::ChainNotFound(id.clone()))?
            .clone();
        let caip_chain_id = chain.caip_network_id(CHAIN);
        let connection = self.connection_for(&chain)?;
        let before = self.store.state();

        let provider_type = before.provider_type.clone().unwrap_or_default();
        let injected = provider_type
            .starts_with(INJECTED_CONNECTOR_ID)
            .then(|| transform_wallet_id(&provider_type))
            .transpose()?;

        self.store.set_caip_chain_id(Some(caip_chain_id.clone()));
        self.store.set_current_chain(Some(chain.clone()));
        self.store.set_connection(Some(connection));
        self.storage
            .set_item(SOLANA_CAIP_CHAIN_ID, &caip_chain_id.to_string());

        if let Some(key) = injected {
            let address = self.adapter(key).and_then(|a| a.address());
            self.store.set_address(address);
        } else if provider_type == WALLET_CONNECT_CONNECTOR_ID {
            if let Some(wc) = self.walletconnect() {
                let namespaces = wc.generate_namespaces(&chain.chain_id);
                let provider = wc.get_provider();
                tokio::spawn(async move {
                    if let Err(e) = provider.connect(namespaces, None).await {
                        log::warn!("walletconnect chain switch failed: {e}");
                    }
                });
            }
        }

        self.react(&before).await;
        Ok(())
    }

    // -- Providers -------------------------------------------------------

    pub async fn set_walletconnect_provider(
        &self,
        address: Option<String>,
    ) -> Result<()> {
        let wc = self
            .walletconnect()
            .ok_or(Error::ProviderNotFound("setWalletConnectProvider"))?;
        let before = self.store.state();

        let stored = self.storage.get_item(SOLANA_CAIP_CHAIN_ID);
        if let Some(chain) = get_chain_from_caip(&self.chains, stored.as_deref()) {
            self.store.set_current_chain(Some(chain.clone()));
        }
        let current = self.store.state().current_chain;

        self.store.set_is_connected(true);
        self.store
            .set_caip_chain_id(current.map(|c| c.caip_network_id(CHAIN)));
        self.store
            .set_provider_type(Some(WALLET_CONNECT_CONNECTOR_ID.to_string()));
        self.store.set_provider(Some(wc as Arc<dyn WalletProvider>));
        self.store.set_address(address);

        self.storage
            .set_item(WALLET_ID, &WalletId::WalletConnect.to_string());

        self.react(&before).await;
        let approved = self.get_approved_caip_networks_data().await?;
        if let Some(appkit) = self.appkit() {
            appkit.set_approved_caip_networks_data(approved);
        }
        Ok(())
    }

    pub async fn set_injected_provider(
        &self,
        provider: Arc<dyn WalletProvider>,
        key: AdapterKey,
        address: Option<String>,
    ) {
        self.storage
            .set_item(WALLET_ID, &WalletId::Injected(key).to_string());

        let before = self.store.state();
        let address = address.filter(|a| !a.is_empty());
        let chain_id = before.current_chain.as_ref().map(|c| c.chain_id.clone());

        let (Some(address), Some(chain_id)) = (address, chain_id) else {
            return;
        };

        self.store.set_is_connected(true);
        self.store
            .set_caip_chain_id(Some(CaipNetworkId::solana(chain_id)));
        self.store
            .set_provider_type(Some(WalletId::Injected(key).to_string()));
        self.store.set_provider(Some(provider.clone()));
        self.store.set_address(Some(address));
        self.watch_injected(provider);
        self.has_synced_connected_account
            .store(true, Ordering::SeqCst);

        self.react(&before).await;
    }

    /// Follows the provider's events until it disconnects. A previous
    /// watcher is stopped first.
    fn watch_injected(&self, provider: Arc<dyn WalletProvider>) {
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

    /// Applies one provider event. Returns `false` once the provider is
    /// gone and nothing more should be read from it.
    pub async fn handle_provider_event(&self, event: ProviderEvent) -> bool {
        let before = self.store.state();
        let keep_listening = match event {
            ProviderEvent::Disconnect => {
                self.storage.remove_item(WALLET_ID);
                self.store.reset();
                false
            }
            ProviderEvent::Connect(address)
            | ProviderEvent::AccountsChanged(Some(address))
                if !address.is_empty() =>
            {
                self.store.set_address(Some(address));
                true
            }
            ProviderEvent::Connect(_) | ProviderEvent::AccountsChanged(_) => {
                self.storage.remove_item(WALLET_ID);
                self.store.reset();
                true
            }
            ProviderEvent::ChainChanged(_) | ProviderEvent::DisplayUri(_) => true,
        };
        self.react(&before).await;
        keep_listening
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
}

#[async_trait]
impl NetworkControllerClient for SolanaClient {
    async fn switch_caip_network(&self, network: Option<CaipNetwork>) -> Result<()> {
        let Some(network) = network else {
            return Ok(());
        };

        let result: Result<()> = async {
            let adapters = (self.adapter_factory)(Some(network.id.reference.as_str()));
            if let Ok(mut slot) = self.adapters.write() {
                *slot = adapters;
            }

            let stored = self.storage.get_item(WALLET_ID);
            if let Some(WalletId::Injected(AdapterKey::Solflare)) =
                stored.as_deref().and_then(parse_wallet_id)
            {
                if let Some(adapter) = self.adapter(AdapterKey::Solflare) {
                    if adapter.is_installed() {
                        let address = adapter.connect().await?;
                        let address = address.or_else(|| adapter.address());
                        self.set_injected_provider(
                            adapter,
                            AdapterKey::Solflare,
                            address,
                        )
                        .await;
                    }
                }
            }

            self.switch_network(&network).await
        }
        .await;

        if let Err(e) = result {
            self.record_error(&e);
        }
        Ok(())
    }

    async fn get_approved_caip_networks_data(
        &self,
    ) -> Result<ApprovedCaipNetworksData> {
        Ok(ApprovedCaipNetworksData {
            approved_caip_network_ids: None,
            supports_all_networks: true,
        })
    }
}

#[async_trait]
impl ConnectionControllerClient for SolanaClient {
    async fn connect_walletconnect(&self, on_uri: OnUri) -> Result<()> {
        let wc = self.walletconnect().ok_or(Error::ProviderNotFound(
            "connectionControllerClient:getWalletConnectUri",
        ))?;
        let chain_id = self.current_chain_id().unwrap_or_default();

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

        self.set_walletconnect_provider(Some(address)).await
    }

    async fn connect_external(&self, options: ConnectExternalOptions) -> Result<()> {
        let key = transform_wallet_id(&options.id)?;
        let adapter = self
            .adapter(key)
            .ok_or_else(|| Error::ConnectorNotFound(options.id.clone()))?;
        let address = adapter.connect().await?;
        let address = address.or_else(|| adapter.address());
        self.set_injected_provider(adapter, key, address).await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let before = self.store.state();
        let provider = self.store.provider();
        self.storage.remove_item(WALLET_ID);

        if before.provider_type.as_deref() == Some(WALLET_CONNECT_CONNECTOR_ID) {
            if let Some(wc) = self.walletconnect() {
                wc.get_provider().disconnect().await?;
            }
        } else if let Some(provider) = provider {
            provider.emit_disconnect();
        }

        self.store.reset();
        self.react(&before).await;
        Ok(())
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        let provider = self.store.provider().ok_or(Error::ProviderNotFound(
            "connectionControllerClient:signMessage",
        ))?;
        let address = self.get_address().ok_or(Error::NotConnected)?;

        let response = provider
            .request(
                "solana_signMessage",
                json!({
                    "message": bs58::encode(message.as_bytes()).into_string(),
                    "pubkey": address,
                }),
            )
            .await?;

        match response {
            Value::String(signature) => Ok(signature),
            Value::Object(ref map) => map
                .get("signature")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::InternalError(format!("unexpected signature: {response}"))
                }),
            other => Err(Error::InternalError(format!(
                "unexpected signature: {other}"
            ))),
        }
    }

    async fn estimate_gas(&self, _args: &SendTransactionArgs) -> Result<U256> {
        Ok(U256::ZERO)
    }

    // Transactions, contracts and ENS only exist on EVM chains; these keep
    // the controller contract uniform.

    async fn send_transaction(&self, _args: SendTransactionArgs) -> Result<String> {
        Ok("0x".to_string())
    }

    async fn write_contract(&self, _args: WriteContractArgs) -> Result<String> {
        Ok("0x".to_string())
    }

    async fn get_ens_address(&self, value: &str) -> Result<Option<String>> {
        Ok(Some(value.to_string()))
    }

    async fn get_ens_avatar(&self, value: &str) -> Result<Option<String>> {
        Ok(Some(value.to_string()))
    }

    fn parse_units(&self, _value: &str, _decimals: u8) -> Result<U256> {
        Ok(U256::ZERO)
    }

    fn format_units(&self, _value: U256, _decimals: u8) -> Result<String> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use crate::chain::{solana, solana_devnet};
    use crate::mock::{MockProvider, MockRpc, MockUniversalProvider};
    use crate::storage::MemoryStorage;
    use crate::types::Metadata;

    const PHANTOM_ADDRESS: &str = "7S3P4HxJpyyigGzodYwHtCxZyUQe9JiBMHyRWXArAaKv";

    struct Harness {
        client: Arc<SolanaClient>,
        appkit: Arc<AppKit>,
        storage: Arc<MemoryStorage>,
        phantom: Arc<MockProvider>,
        rpc: Arc<MockRpc>,
        universal: Arc<MockUniversalProvider>,
    }

    fn options() -> AppKitOptions {
        AppKitOptions::new("pid")
            .with_chains(vec![solana(), solana_devnet()])
            .with_provider_config(ProviderConfig {
                project_id: "pid".to_string(),
                metadata: Metadata::default(),
            })
    }

    fn factory(phantom: Arc<MockProvider>) -> AdapterFactory {
        Arc::new(move |_network| {
            let mut adapters: WalletAdapters = BTreeMap::new();
            adapters.insert(AdapterKey::Phantom, phantom.clone());
            let solflare = MockProvider::new("Solflare", None);
            solflare.set_installed(false);
            adapters.insert(AdapterKey::Solflare, Arc::new(solflare));
            adapters
        })
    }

    async fn harness_with(storage: Arc<MemoryStorage>) -> Harness {
        let phantom = Arc::new(MockProvider::new("Phantom", Some(PHANTOM_ADDRESS)));
        let rpc = Arc::new(MockRpc::new(1_500_000_000));
        let universal = Arc::new(MockUniversalProvider::new());
        let client =
            SolanaClient::new(options(), storage.clone(), factory(phantom.clone()))
                .unwrap();
        client.set_rpc(rpc.clone());
        let appkit = Arc::new(AppKit::new());
        client
            .construct(appkit.clone(), &options(), Some(universal.clone()))
            .await
            .unwrap();
        Harness {
            client,
            appkit,
            storage,
            phantom,
            rpc,
            universal,
        }
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(MemoryStorage::new())).await
    }

    #[test]
    fn test_new_requires_solana_config() {
        let options = AppKitOptions::new("pid").with_chains(vec![solana()]);
        let err = SolanaClient::new(
            options,
            Arc::new(MemoryStorage::new()),
            factory(Arc::new(MockProvider::new("Phantom", None))),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::MissingOption(_)));
    }

    #[tokio::test]
    async fn test_construct_requires_project_id() {
        let client = SolanaClient::new(
            options(),
            Arc::new(MemoryStorage::new()),
            factory(Arc::new(MockProvider::new("Phantom", None))),
        )
        .unwrap();
        let err = client
            .construct(Arc::new(AppKit::new()), &AppKitOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingOption(_)));
    }

    #[test]
    fn test_new_restores_stored_chain() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(SOLANA_CAIP_CHAIN_ID, "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1");
        let client = SolanaClient::new(
            options(),
            storage,
            factory(Arc::new(MockProvider::new("Phantom", None))),
        )
        .unwrap();
        let state = client.store().state();
        assert_eq!(state.current_chain, Some(solana_devnet()));
        assert_eq!(
            client.get_wallet_connection().unwrap().url,
            "https://api.devnet.solana.com"
        );
    }

    #[tokio::test]
    async fn test_construct_syncs_networks_and_connectors() {
        let h = harness().await;
        let state = h.appkit.state();

        assert_eq!(state.active_chain, Some(ChainNamespace::Solana));
        assert_eq!(
            state.network.caip_network.unwrap().id,
            CaipNetworkId::solana(crate::constants::SOLANA_MAINNET_REF)
        );
        assert_eq!(state.network.requested_caip_networks[&CHAIN].len(), 2);
        assert!(state.eip6963_enabled);

        let ids: Vec<String> = state.connectors.iter().map(|c| c.id.clone()).collect();
        // Solflare is not installed
        assert_eq!(ids, vec!["walletConnect", "phantom"]);
        assert_eq!(state.connectors[0].name.as_deref(), Some("WalletConnect"));
    }

    #[tokio::test]
    async fn test_connect_external_syncs_account() {
        let h = harness().await;
        h.client
            .connect_external(ConnectExternalOptions {
                id: "Phantom".to_string(),
                chain_id: None,
            })
            .await
            .unwrap();

        assert_eq!(h.client.get_address().as_deref(), Some(PHANTOM_ADDRESS));
        assert_eq!(
            h.client.get_wallet_provider_type().as_deref(),
            Some("injected_phantom")
        );
        assert_eq!(
            h.storage.get_item(WALLET_ID).as_deref(),
            Some("injected_phantom")
        );

        let account = h.appkit.account(&CHAIN);
        assert!(account.is_connected);
        assert_eq!(
            account.caip_address.unwrap().to_string(),
            format!("solana:{}:{PHANTOM_ADDRESS}", crate::constants::SOLANA_MAINNET_REF)
        );
        assert_eq!(account.balance.as_deref(), Some("1.5"));
        assert_eq!(account.balance_symbol.as_deref(), Some("SOL"));
        assert_eq!(h.rpc.calls()[0].1, PHANTOM_ADDRESS);
        assert!(h.client.has_synced_connected_account());
    }

    #[tokio::test]
    async fn test_connect_unknown_wallet() {
        let h = harness().await;
        let err = h
            .client
            .connect_external(ConnectExternalOptions {
                id: "metamask".to_string(),
                chain_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectorNotFound(_)));
    }

    #[tokio::test]
    async fn test_disconnect_resets_everything() {
        let h = harness().await;
        h.client
            .connect_external(ConnectExternalOptions {
                id: "phantom".to_string(),
                chain_id: None,
            })
            .await
            .unwrap();
        h.client.disconnect().await.unwrap();

        assert_eq!(h.client.get_address(), None);
        assert!(h.client.get_wallet_provider().is_none());
        assert_eq!(h.storage.get_item(WALLET_ID), None);
        assert!(!h.appkit.get_is_connected(&CHAIN));
        // chain selection survives
        assert_eq!(h.client.store().state().current_chain, Some(solana()));
    }

    #[tokio::test]
    async fn test_provider_events() {
        let h = harness().await;
        h.client
            .connect_external(ConnectExternalOptions {
                id: "phantom".to_string(),
                chain_id: None,
            })
            .await
            .unwrap();

        assert!(
            h.client
                .handle_provider_event(ProviderEvent::AccountsChanged(Some(
                    "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string()
                )))
                .await
        );
        assert_eq!(
            h.appkit.account(&CHAIN).address(),
            Some("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")
        );

        assert!(
            h.client
                .handle_provider_event(ProviderEvent::AccountsChanged(None))
                .await
        );
        assert_eq!(h.client.get_address(), None);
        assert_eq!(h.storage.get_item(WALLET_ID), None);
    }

    #[tokio::test]
    async fn test_watcher_handles_disconnect_event() {
        let h = harness().await;
        h.client
            .connect_external(ConnectExternalOptions {
                id: "phantom".to_string(),
                chain_id: None,
            })
            .await
            .unwrap();

        let mut rx = h.client.subscribe_provider();
        h.phantom.emit(ProviderEvent::Disconnect);
        tokio::time::timeout(Duration::from_secs(1), async {
            while rx.borrow_and_update().is_connected {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        assert_eq!(h.storage.get_item(WALLET_ID), None);
        assert_eq!(h.client.get_address(), None);
    }

    #[tokio::test]
    async fn test_check_active_providers_reconnects_stored_wallet() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(WALLET_ID, "injected_phantom");
        let h = harness_with(storage).await;

        assert_eq!(h.phantom.connects(), 1);
        assert_eq!(h.client.get_address().as_deref(), Some(PHANTOM_ADDRESS));
        assert!(h.appkit.get_is_connected(&CHAIN));
    }

    #[tokio::test]
    async fn test_check_active_providers_stores_error() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(WALLET_ID, "injected_phantom");
        let phantom = Arc::new(MockProvider::new("Phantom", None));
        phantom.fail_connect("user rejected");
        let client =
            SolanaClient::new(options(), storage, factory(phantom)).unwrap();
        client
            .construct(Arc::new(AppKit::new()), &options(), None)
            .await
            .unwrap();

        let error = client.store().state().error.unwrap();
        assert!(error.contains("user rejected"));
    }

    #[tokio::test]
    async fn test_connect_walletconnect() {
        let h = harness().await;
        let account = format!(
            "solana:{}:{PHANTOM_ADDRESS}",
            crate::constants::SOLANA_MAINNET_REF
        );
        h.universal.settle_with(vec![account.as_str()]);

        let uris = Arc::new(Mutex::new(vec![]));
        let seen = uris.clone();
        h.client
            .connect_walletconnect(Arc::new(move |uri| {
                seen.lock().unwrap().push(uri);
            }))
            .await
            .unwrap();

        assert_eq!(uris.lock().unwrap().len(), 1);
        assert!(h.appkit.state().wc_uri.is_some());
        assert_eq!(
            h.client.get_wallet_provider_type().as_deref(),
            Some("walletConnect")
        );
        assert_eq!(
            h.client.store().state().caip_chain_id,
            Some(CaipNetworkId::solana(crate::constants::SOLANA_MAINNET_REF))
        );
        assert_eq!(h.storage.get_item(WALLET_ID).as_deref(), Some("walletConnect"));
        assert!(h.appkit.state().network.supports_all_networks);
        assert!(h.appkit.get_is_connected(&CHAIN));
    }

    #[tokio::test]
    async fn test_connect_walletconnect_without_connector() {
        let client = SolanaClient::new(
            options(),
            Arc::new(MemoryStorage::new()),
            factory(Arc::new(MockProvider::new("Phantom", None))),
        )
        .unwrap();
        let err = client
            .connect_walletconnect(Arc::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(_)));
    }

    #[tokio::test]
    async fn test_switch_caip_network() {
        let h = harness().await;
        h.client
            .connect_external(ConnectExternalOptions {
                id: "phantom".to_string(),
                chain_id: None,
            })
            .await
            .unwrap();

        let reads = h.rpc.calls().len();
        let devnet = solana_devnet().to_caip_network(CHAIN, None);
        h.client.switch_caip_network(Some(devnet)).await.unwrap();
        // one balance read for the new chain
        assert_eq!(h.rpc.calls().len(), reads + 1);
        assert_eq!(
            h.appkit.account(&CHAIN).caip_address.unwrap().to_string(),
            format!("solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1:{PHANTOM_ADDRESS}")
        );

        let state = h.client.store().state();
        assert_eq!(state.current_chain, Some(solana_devnet()));
        assert_eq!(state.error, None);
        assert_eq!(
            h.storage.get_item(SOLANA_CAIP_CHAIN_ID).as_deref(),
            Some("solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1")
        );
        assert_eq!(
            h.appkit.caip_network().unwrap().id.reference,
            "EtWTRABZaYq6iMfeYKouRu166VU2xqa1"
        );
        assert_eq!(
            h.appkit.account(&CHAIN).address_explorer_url,
            solana_devnet().account_explorer_url(PHANTOM_ADDRESS)
        );
        assert!(h.appkit.get_is_connected(&CHAIN));
    }

    #[tokio::test]
    async fn test_switch_to_unknown_network_falls_back() {
        let h = harness().await;
        let unknown = CaipNetwork {
            id: CaipNetworkId::solana("unknown"),
            name: None,
            image_id: None,
            image_url: None,
            chain_namespace: CHAIN,
        };
        h.client.switch_caip_network(Some(unknown)).await.unwrap();
        // unknown references resolve to the first configured chain
        assert_eq!(h.client.store().state().current_chain, Some(solana()));
    }

    #[tokio::test]
    async fn test_sign_message() {
        let h = harness().await;
        let err = h.client.sign_message("hello").await.unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(_)));

        h.client
            .connect_external(ConnectExternalOptions {
                id: "phantom".to_string(),
                chain_id: None,
            })
            .await
            .unwrap();
        h.phantom
            .respond("solana_signMessage", json!({ "signature": "5ig" }));
        assert_eq!(h.client.sign_message("hello").await.unwrap(), "5ig");

        let (method, params) = h.phantom.requests().pop().unwrap();
        assert_eq!(method, "solana_signMessage");
        assert_eq!(params["pubkey"], PHANTOM_ADDRESS);
        assert_eq!(params["message"], bs58::encode("hello").into_string());
    }

    #[tokio::test]
    async fn test_evm_only_operations() {
        let h = harness().await;
        let args = SendTransactionArgs::default();
        assert_eq!(h.client.estimate_gas(&args).await.unwrap(), U256::ZERO);
        assert_eq!(h.client.send_transaction(args).await.unwrap(), "0x");
        assert_eq!(
            h.client.get_ens_address("vitalik.eth").await.unwrap().as_deref(),
            Some("vitalik.eth")
        );
        assert_eq!(h.client.format_units(U256::from(5u8), 9).unwrap(), "");
    }
}
