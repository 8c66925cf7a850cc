/// Connectors
///
/// The contract every wallet provider is normalized to, whether it is a
/// browser-injected extension, a Solana wallet adapter or a WalletConnect
/// remote signer.
///
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::caip::ChainNamespace;
use crate::constants::{INJECTED_CONNECTOR_ID, WALLET_CONNECT_CONNECTOR_ID};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorType {
    WalletConnect,
    Injected,
    Announced,
    External,
    Auth,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_id: Option<String>,
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub chain: ChainNamespace,
}

/// Events a wallet provider emits. Addresses are already rendered in the
/// chain's native text format (base58 for Solana, hex for EVM).
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    Connect(String),
    AccountsChanged(Option<String>),
    ChainChanged(String),
    Disconnect,
    DisplayUri(String),
}

/// A wallet the user can connect. Implemented outside this crate for
/// every concrete wallet integration.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn name(&self) -> String;

    /// Whether the wallet is available in the current environment.
    fn is_installed(&self) -> bool {
        true
    }

    /// Prompts the wallet for access and returns the connected address.
    async fn connect(&self) -> anyhow::Result<Option<String>>;

    async fn disconnect(&self) -> anyhow::Result<()>;

    /// Currently exposed account, if any.
    fn address(&self) -> Option<String>;

    /// Forwards a JSON-RPC style request to the wallet.
    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value>;

    fn events(&self) -> broadcast::Receiver<ProviderEvent>;

    /// Makes the provider emit a `disconnect` event to its listeners.
    fn emit_disconnect(&self);
}

/// Solana wallet adapters a client knows how to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdapterKey {
    Phantom,
    Solflare,
    Backpack,
    TrustWallet,
    Huobi,
    Coinbase,
}

impl AdapterKey {
    pub const ALL: [AdapterKey; 6] = [
        AdapterKey::Phantom,
        AdapterKey::Solflare,
        AdapterKey::Backpack,
        AdapterKey::TrustWallet,
        AdapterKey::Huobi,
        AdapterKey::Coinbase,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            AdapterKey::Phantom => "Phantom",
            AdapterKey::Solflare => "Solflare",
            AdapterKey::Backpack => "Backpack",
            AdapterKey::TrustWallet => "Trust",
            AdapterKey::Huobi => "Huobi",
            AdapterKey::Coinbase => "Coinbase",
        }
    }
}

impl Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_plain::to_string(self).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for AdapterKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        serde_plain::from_str(s).map_err(|_| Error::ConnectorNotFound(s.to_string()))
    }
}

/// Maps a connector id chosen in the UI to the adapter key.
pub fn transform_wallet_id(wallet_id: &str) -> Result<AdapterKey> {
    let lower = wallet_id.to_lowercase();
    let lower = lower.strip_prefix("injected_").unwrap_or(&lower);
    match lower {
        "trust" | "trustwallet" => Ok(AdapterKey::TrustWallet),
        other => other.parse(),
    }
}

/// What `@w3m/wallet_id` holds for a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletId {
    WalletConnect,
    Injected(AdapterKey),
}

impl Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletId::WalletConnect => f.write_str(WALLET_CONNECT_CONNECTOR_ID),
            WalletId::Injected(key) => {
                write!(f, "{INJECTED_CONNECTOR_ID}_{key}")
            }
        }
    }
}

pub fn parse_wallet_id(value: &str) -> Option<WalletId> {
    if value == WALLET_CONNECT_CONNECTOR_ID {
        return Some(WalletId::WalletConnect);
    }
    let (prefix, key) = value.split_once('_')?;
    if prefix != INJECTED_CONNECTOR_ID {
        return None;
    }
    key.parse().ok().map(WalletId::Injected)
}

pub type WalletAdapters = BTreeMap<AdapterKey, Arc<dyn WalletProvider>>;

/// Builds the adapter set, optionally bound to a network reference. Some
/// adapters (Solflare) take the network at construction time, so the set is
/// rebuilt whenever the network changes.
pub type AdapterFactory =
    Arc<dyn Fn(Option<&str>) -> WalletAdapters + Send + Sync>;

/// Appends an injected connector for every adapter that is installed.
pub fn sync_injected_wallets(
    connectors: &mut Vec<Connector>,
    adapters: &WalletAdapters,
    chain: ChainNamespace,
) {
    for (key, adapter) in adapters {
        if !adapter.is_installed() {
            continue;
        }
        connectors.push(Connector {
            id: key.to_string(),
            explorer_id: None,
            connector_type: ConnectorType::Injected,
            image_url: None,
            name: Some(adapter.name()),
            chain: chain.clone(),
        });
    }
}
