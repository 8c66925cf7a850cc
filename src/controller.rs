/// Controller clients
///
/// The two contracts every chain client fulfils so the same UI flow can
/// drive a Solana wallet or an EVM one.
///
use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::appkit::ApprovedCaipNetworksData;
use crate::chain::CaipNetwork;
use crate::error::Result;

/// Receives the pairing uri while a WalletConnect session is proposed.
pub type OnUri = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectExternalOptions {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionArgs {
    pub to: String,
    #[serde(default)]
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteContractArgs {
    pub receiver_address: String,
    pub token_address: String,
    pub token_amount: U256,
    pub method: String,
    #[serde(default)]
    pub abi: Value,
}

#[async_trait]
pub trait ConnectionControllerClient: Send + Sync {
    async fn connect_walletconnect(&self, on_uri: OnUri) -> Result<()>;

    async fn connect_external(&self, options: ConnectExternalOptions) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    async fn sign_message(&self, message: &str) -> Result<String>;

    async fn estimate_gas(&self, args: &SendTransactionArgs) -> Result<U256>;

    async fn send_transaction(&self, args: SendTransactionArgs) -> Result<String>;

    async fn write_contract(&self, args: WriteContractArgs) -> Result<String>;

    async fn get_ens_address(&self, value: &str) -> Result<Option<String>>;

    async fn get_ens_avatar(&self, value: &str) -> Result<Option<String>>;

    fn parse_units(&self, value: &str, decimals: u8) -> Result<U256>;

    fn format_units(&self, value: U256, decimals: u8) -> Result<String>;
}

#[async_trait]
pub trait NetworkControllerClient: Send + Sync {
    async fn switch_caip_network(&self, network: Option<CaipNetwork>) -> Result<()>;

    async fn get_approved_caip_networks_data(&self)
    -> Result<ApprovedCaipNetworksData>;
}
