/// RPC
///
/// Minimal JSON-RPC 2.0 over HTTP. Only the reads the clients need to keep
/// their state in sync (balances, chain id) go through here, everything
/// else is the wallet's business.
///
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::caip::ChainNamespace;
use crate::error::{Error, Result};
use crate::types::Commitment;

/// Endpoint a client reads chain state from. Kept as plain data in the
/// connection store, turned into an [`RpcClient`] when used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcConnection {
    pub url: String,
    pub commitment: Commitment,
}

impl RpcConnection {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Self {
        Self {
            url: url.into(),
            commitment,
        }
    }

    pub fn client(&self) -> RpcClient {
        RpcClient::new(&self.url)
    }
}

/// Chain reads the clients depend on. [`RpcClient`] is the HTTP
/// implementation; anything else (a cached indexer, a test double) can
/// stand in.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Balance in the smallest unit (lamports or wei).
    async fn get_balance(
        &self,
        namespace: &ChainNamespace,
        address: &str,
        commitment: Commitment,
    ) -> Result<U256>;
}

#[derive(Clone, Debug)]
pub struct RpcClient {
    url: String,
    client: Client,
    id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: &str) -> Self {
        let initial: u16 = rand::thread_rng().r#gen();
        Self {
            url: url.to_string(),
            client: Client::new(),
            id: Arc::new(AtomicU64::new(initial as u64)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn get_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let extra = self.id.fetch_add(1, Ordering::Relaxed) % 1000;
        now * 1000 + extra
    }

    pub async fn request<R>(&self, method: &str, params: Value) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params: Some(params),
            id: self.get_id(),
        };
        log::debug!("rpc {} -> {method}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json::<JsonRpcResponse>()
            .await?;

        response.into_result()
    }

    pub async fn balance(
        &self,
        namespace: &ChainNamespace,
        address: &str,
        commitment: Commitment,
    ) -> Result<U256> {
        match namespace {
            ChainNamespace::Solana => {
                let lamports = self.solana_balance(address, commitment).await?;
                Ok(U256::from(lamports))
            }
            ChainNamespace::Eip155 => {
                let address: Address = address
                    .parse()
                    .map_err(|_| Error::InvalidAddress(address.to_string()))?;
                self.eth_balance(address).await
            }
            other => Err(Error::UnsupportedNamespace(other.to_string())),
        }
    }

    pub async fn solana_balance(
        &self,
        address: &str,
        commitment: Commitment,
    ) -> Result<u64> {
        let result: SolanaContextValue<u64> = self
            .request(
                "getBalance",
                json!([address, { "commitment": commitment.as_str() }]),
            )
            .await?;
        Ok(result.value)
    }

    pub async fn eth_balance(&self, address: Address) -> Result<U256> {
        let hex: String = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&hex)
    }

    pub async fn eth_chain_id(&self) -> Result<u64> {
        let hex: String = self.request("eth_chainId", json!([])).await?;
        let value = parse_quantity(&hex)?;
        u64::try_from(value)
            .map_err(|_| Error::InternalError(format!("chain id too big: {hex}")))
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn get_balance(
        &self,
        namespace: &ChainNamespace,
        address: &str,
        commitment: Commitment,
    ) -> Result<U256> {
        self.balance(namespace, address, commitment).await
    }
}

/// Parses an Ethereum JSON-RPC quantity (`0x`-prefixed hex).
pub fn parse_quantity(hex: &str) -> Result<U256> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .ok_or_else(|| Error::InternalError(format!("not a quantity: {hex}")))?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| Error::InternalError(format!("not a quantity: {hex} {e}")))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Balance {
    pub value: U256,
    pub decimals: u8,
    pub symbol: String,
}

impl Balance {
    pub fn new(value: U256, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            value,
            decimals,
            symbol: symbol.into(),
        }
    }

    /// Decimal representation without trailing zeros, e.g. `1.5`.
    pub fn formatted(&self) -> String {
        format_units(self.value, self.decimals)
    }
}

/// Renders `value` smallest units as a decimal amount with `decimals`
/// fractional digits, trailing zeros dropped.
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = decimals as usize;
    let digits = value.to_string();
    // Left-pad so there is always at least one integer digit
    let digits = format!("{digits:0>width$}", width = decimals + 1);
    let (integer, fraction) = digits.split_at(digits.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

/// Inverse of [`format_units`]: `"1.5"` with 18 decimals is 1.5e18.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256> {
    let invalid = || Error::InternalError(format!("invalid amount: {value}"));
    let (integer, fraction) = value.trim().split_once('.').unwrap_or((value.trim(), ""));
    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize
        || !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let digits = format!(
        "{integer}{fraction}{}",
        "0".repeat(decimals as usize - fraction.len())
    );
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid())
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.formatted(), self.symbol)
    }
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    id: u64,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn into_result<R: DeserializeOwned>(self) -> Result<R> {
        if let Some(error) = self.error {
            Err(error.into())
        } else if let Some(result) = self.result {
            Ok(serde_json::from_value(result)?)
        } else {
            Err("Unexpected response: neither result nor error".into())
        }
    }
}

/// A JSON-RPC error object (code, message, and optional data).
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

#[derive(Deserialize, Debug)]
struct SolanaContextValue<T> {
    value: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity("0x").unwrap(), U256::ZERO);
        assert_eq!(
            parse_quantity("0xde0b6b3a7640000").unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_balance_formatted() {
        let one_and_half_eth = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(Balance::new(one_and_half_eth, 18, "ETH").formatted(), "1.5");
        assert_eq!(
            Balance::new(U256::from(2_000_000_000u64), 9, "SOL").to_string(),
            "2 SOL"
        );
        assert_eq!(Balance::new(U256::from(1u8), 9, "SOL").formatted(), "0.000000001");
        assert_eq!(Balance::new(U256::ZERO, 18, "ETH").formatted(), "0");
        assert_eq!(Balance::new(U256::from(42u8), 0, "X").formatted(), "42");
    }

    #[test]
    fn test_format_units_beyond_u256_scale() {
        let formatted = format_units(U256::MAX, 80);
        assert!(formatted.starts_with("0.00115792089237316195"));
        assert_eq!(formatted.len(), "0.".len() + 80);
        assert_eq!(format_units(U256::from(1u8), 255).len(), "0.".len() + 255);
        assert_eq!(
            parse_units(&format_units(U256::MAX, 80), 80).unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(parse_units("2", 9).unwrap(), U256::from(2_000_000_000u64));
        assert_eq!(parse_units("0.000000001", 9).unwrap(), U256::from(1u8));
        assert_eq!(parse_units("0", 18).unwrap(), U256::ZERO);
        assert!(parse_units("0.0000000001", 9).is_err());
        assert!(parse_units("1,5", 18).is_err());
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
    }

    #[test]
    fn test_response_into_result() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":5000}}"#,
        )
        .unwrap();
        let result: SolanaContextValue<u64> = response.into_result().unwrap();
        assert_eq!(result.value, 5000);

        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#,
        )
        .unwrap();
        let err = response.into_result::<Value>().unwrap_err();
        assert!(matches!(err, Error::JsonRpc(e) if e.code == -32602));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let client = RpcClient::new("http://localhost:8545");
        let a = client.get_id();
        let b = client.get_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unsupported_namespace_balance() {
        let client = RpcClient::new("http://localhost:1");
        let err = client
            .get_balance(
                &ChainNamespace::Polkadot,
                "abc",
                Commitment::Confirmed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedNamespace(_)));

        let err = client
            .get_balance(&ChainNamespace::Eip155, "nope", Commitment::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }
}
