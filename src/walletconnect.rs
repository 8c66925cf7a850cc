/// WalletConnect connector
///
/// Wraps the external WalletConnect client (the "universal provider") so a
/// remote wallet can be driven through the same connector contract as an
/// injected one. Pairing and relay traffic stay inside the universal
/// provider, this module only builds the namespaces it is asked to
/// approve and reads the accounts it settled on.
///
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::caip::{CaipNetworkId, ChainNamespace, parse_caip_address};
use crate::chain::{Chain, detect_rpc_url, get_chain_from_caip};
use crate::connector::{ProviderEvent, WalletProvider};
use crate::constants::{
    EIP155_EVENTS, EIP155_METHODS, LAMPORTS_DECIMALS, SOLANA_METHODS,
    WEI_DECIMALS,
};
use crate::error::{Error, Result};
use crate::rpc::{Balance, RpcClient};
use crate::types::{Commitment, Metadata, Namespace, Namespaces};
use crate::utils::{UriParameters, parse_uri, unix_timestamp};

/// The external WalletConnect client.
#[async_trait]
pub trait UniversalProvider: Send + Sync {
    /// Proposes a session with the given namespaces and resolves with the
    /// namespaces the wallet settled.
    async fn connect(
        &self,
        namespaces: Namespaces,
        pairing_topic: Option<String>,
    ) -> anyhow::Result<Namespaces>;

    /// CAIP-10 accounts of the active session.
    async fn enable(&self) -> anyhow::Result<Vec<String>>;

    async fn disconnect(&self) -> anyhow::Result<()>;

    async fn request(
        &self,
        method: &str,
        params: Value,
        chain_id: Option<CaipNetworkId>,
    ) -> anyhow::Result<Value>;

    /// Namespaces of the active session, if any.
    fn session(&self) -> Option<Namespaces>;

    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}

#[derive(Clone, Debug)]
pub struct WalletConnectConnectorOptions {
    pub project_id: String,
    pub relay_url: String,
    pub metadata: Metadata,
    pub chains: Vec<Chain>,
    pub qrcode: bool,
}

pub struct WalletConnectConnector {
    options: WalletConnectConnectorOptions,
    namespace: ChainNamespace,
    provider: Arc<dyn UniversalProvider>,
}

impl WalletConnectConnector {
    pub fn new(
        options: WalletConnectConnectorOptions,
        namespace: ChainNamespace,
        provider: Arc<dyn UniversalProvider>,
    ) -> Self {
        Self {
            options,
            namespace,
            provider,
        }
    }

    pub fn name(&self) -> &'static str {
        "WalletConnect"
    }

    pub fn options(&self) -> &WalletConnectConnectorOptions {
        &self.options
    }

    pub fn get_provider(&self) -> Arc<dyn UniversalProvider> {
        self.provider.clone()
    }

    /// Solana namespaces for a single chain reference.
    pub fn generate_namespaces(&self, chain_id: &str) -> Namespaces {
        Namespaces::from([(
            ChainNamespace::Solana.to_string(),
            Namespace {
                chains: vec![CaipNetworkId::solana(chain_id).to_string()],
                methods: SOLANA_METHODS.map(str::to_string).to_vec(),
                events: vec![],
                ..Default::default()
            },
        )])
    }

    /// EIP-155 namespaces covering every configured chain, with `chain_id`
    /// moved to the front so wallets pick it as the active one.
    pub fn generate_eip155_namespaces(&self, chain_id: &str) -> Namespaces {
        let mut chains: Vec<&Chain> = self.options.chains.iter().collect();
        chains.sort_by_key(|c| c.chain_id != chain_id);

        let rpc_map = chains
            .iter()
            .map(|c| (c.chain_id.clone(), c.rpc_url.clone()))
            .collect();

        Namespaces::from([(
            ChainNamespace::Eip155.to_string(),
            Namespace {
                chains: chains
                    .iter()
                    .map(|c| c.caip_network_id(ChainNamespace::Eip155).to_string())
                    .collect(),
                methods: EIP155_METHODS.map(str::to_string).to_vec(),
                events: EIP155_EVENTS.map(str::to_string).to_vec(),
                accounts: None,
                rpc_map: Some(rpc_map),
            },
        )])
    }

    pub fn namespaces_for(&self, chain_id: &str) -> Namespaces {
        match self.namespace {
            ChainNamespace::Eip155 => self.generate_eip155_namespaces(chain_id),
            _ => self.generate_namespaces(chain_id),
        }
    }

    /// Connects (or with `restore`, resumes) a session and returns the first
    /// account address of this connector's namespace.
    pub async fn connect(&self, restore: bool, chain_id: &str) -> Result<String> {
        if restore {
            if let Some(address) = self
                .provider
                .session()
                .and_then(|ns| self.first_account(&ns))
            {
                log::debug!("walletconnect session restored for {address}");
                return Ok(address);
            }
        }

        let settled = self
            .provider
            .connect(self.namespaces_for(chain_id), None)
            .await?;

        self.first_account(&settled).ok_or(Error::NotConnected)
    }

    /// First address from `enable()`, CAIP-10 accounts are unwrapped.
    pub async fn enable(&self) -> Result<Option<String>> {
        let accounts = self.provider.enable().await?;
        Ok(accounts.first().map(|account| {
            parse_caip_address(account)
                .map(|a| a.address)
                .unwrap_or_else(|_| account.clone())
        }))
    }

    fn first_account(&self, namespaces: &Namespaces) -> Option<String> {
        namespaces
            .get(self.namespace.as_str())?
            .accounts
            .as_ref()?
            .iter()
            .find_map(|a| parse_caip_address(a).ok())
            .map(|a| a.address)
    }

    /// Chains the wallet approved in the active session.
    pub fn approved_caip_network_ids(&self) -> Option<Vec<CaipNetworkId>> {
        let session = self.provider.session()?;
        let namespace = session.get(self.namespace.as_str())?;
        Some(
            namespace
                .chains
                .iter()
                .filter_map(|c| c.parse().ok())
                .collect(),
        )
    }

    pub async fn get_balance(
        &self,
        address: &str,
        caip_chain_id: Option<&str>,
        commitment: Commitment,
    ) -> Result<Balance> {
        let chain = get_chain_from_caip(&self.options.chains, caip_chain_id)
            .ok_or_else(|| {
                Error::ChainNotFound(caip_chain_id.unwrap_or_default().to_string())
            })?;
        let url =
            detect_rpc_url(chain, &self.namespace, &self.options.project_id)?;
        let decimals = match self.namespace {
            ChainNamespace::Solana => LAMPORTS_DECIMALS,
            _ => WEI_DECIMALS,
        };
        let value = RpcClient::new(&url)
            .balance(&self.namespace, address, commitment)
            .await?;
        Ok(Balance::new(value, decimals, chain.currency.clone()))
    }
}

/// Validates a `display_uri` payload before it is shown to the user.
pub fn validate_display_uri(uri: &str) -> Result<UriParameters> {
    let params = parse_uri(uri.to_string())?;
    if params.is_expired(unix_timestamp()) {
        return Err(Error::InvalidUri);
    }
    Ok(params)
}

#[async_trait]
impl WalletProvider for WalletConnectConnector {
    fn name(&self) -> String {
        WalletConnectConnector::name(self).to_string()
    }

    async fn connect(&self) -> anyhow::Result<Option<String>> {
        let chain_id = self
            .options
            .chains
            .first()
            .map(|c| c.chain_id.clone())
            .unwrap_or_default();
        Ok(Some(WalletConnectConnector::connect(self, true, &chain_id).await?))
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.provider.disconnect().await
    }

    fn address(&self) -> Option<String> {
        self.provider
            .session()
            .and_then(|ns| self.first_account(&ns))
    }

    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        self.provider.request(method, params, None).await
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.provider.events()
    }

    fn emit_disconnect(&self) {
        log::debug!("walletconnect sessions end through disconnect()");
    }
}
