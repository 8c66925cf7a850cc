use std::sync::{Arc, Mutex};

use alloy::hex;
use alloy::signers::{
    SignerSync, k256::ecdsa::SigningKey, local::PrivateKeySigner,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use walletconnect_appkit::{
    AppKit, AppKitOptions, ChainNamespace, ConnectionControllerClient,
    EvmClient, NetworkControllerClient,
    chain,
    connector::{ProviderEvent, WalletProvider},
    controller::ConnectExternalOptions,
    evm::{Eip6963ProviderInfo, parse_chain_id},
    network::NetworkSelection,
    rpc::JsonRpcError,
    siwx::{SiwxMessage, SiwxMessageParams, SiwxSession},
    storage::MemoryStorage,
    types::Metadata,
};

/// EIP-1193 wallet backed by a local private key. Knows mainnet only until
/// a dApp adds more chains.
struct LocalWallet {
    signer: PrivateKeySigner,
    chain_id: Mutex<u64>,
    known_chains: Mutex<Vec<u64>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWallet {
    fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            signer: PrivateKeySigner::from(SigningKey::random(&mut OsRng)),
            chain_id: Mutex::new(1),
            known_chains: Mutex::new(vec![1]),
            events,
        }
    }

    fn chain_id_param(params: &Value) -> anyhow::Result<u64> {
        let chain_id = params[0]["chainId"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("chainId missing"))?;
        Ok(parse_chain_id(chain_id)?)
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    fn name(&self) -> String {
        "Local Wallet".to_string()
    }

    async fn connect(&self) -> anyhow::Result<Option<String>> {
        Ok(self.address())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.emit_disconnect();
        Ok(())
    }

    fn address(&self) -> Option<String> {
        Some(self.signer.address().to_string())
    }

    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => {
                Ok(json!([self.signer.address()]))
            }
            "eth_chainId" => {
                Ok(json!(format!("0x{:x}", *self.chain_id.lock().unwrap())))
            }
            "personal_sign" => {
                let message = params[0]
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("message missing"))?;
                let signature =
                    self.signer.sign_message_sync(&hex::decode(message)?)?;
                Ok(json!(hex::encode_prefixed(signature.as_bytes())))
            }
            "wallet_switchEthereumChain" => {
                let chain_id = Self::chain_id_param(&params)?;
                if !self.known_chains.lock().unwrap().contains(&chain_id) {
                    return Err(JsonRpcError {
                        code: 4902,
                        message: "Unrecognized chain ID".to_string(),
                        data: None,
                    }
                    .into());
                }
                *self.chain_id.lock().unwrap() = chain_id;
                let _ = self
                    .events
                    .send(ProviderEvent::ChainChanged(format!("0x{chain_id:x}")));
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = Self::chain_id_param(&params)?;
                self.known_chains.lock().unwrap().push(chain_id);
                *self.chain_id.lock().unwrap() = chain_id;
                Ok(Value::Null)
            }
            other => anyhow::bail!("unsupported method {other}"),
        }
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    fn emit_disconnect(&self) {
        let _ = self.events.send(ProviderEvent::Disconnect);
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let project_id = "35d44d49c2dee217a3eb24bb4410acc7";
    let options = AppKitOptions::new(project_id)
        .with_chains(vec![chain::ethereum(), chain::polygon(), chain::sepolia()])
        .with_metadata(Metadata {
            name: "AppKit Rust".to_string(),
            description: "Connects an EVM wallet from Rust".to_string(),
            url: "https://github.com/zemse/walletconnect-appkit-rs".to_string(),
            icons: vec![],
        });
    let storage = Arc::new(MemoryStorage::new());

    let client = EvmClient::new(options.clone(), storage.clone(), None)
        .expect("client failed");
    let appkit = Arc::new(AppKit::new());
    client
        .construct(appkit.clone(), &options, None)
        .await
        .expect("construct failed");

    // Browser extensions announce themselves over EIP-6963
    client.add_announced_provider(
        Eip6963ProviderInfo {
            uuid: "7677b54f-3486-46e2-4e37-bf8747814f5d".to_string(),
            name: "Local Wallet".to_string(),
            icon: "data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=".to_string(),
            rdns: "rs.appkit.local".to_string(),
        },
        Arc::new(LocalWallet::new()),
    );
    println!("connectors: {:?}", appkit.get_connectors());

    client
        .connect_external(ConnectExternalOptions {
            id: "rs.appkit.local".to_string(),
            chain_id: None,
        })
        .await
        .expect("connect failed");

    let account = appkit.account(&ChainNamespace::Eip155);
    println!("account: {account:?}");

    // Sign in with Ethereum
    let message = SiwxMessage::new(
        SiwxMessageParams {
            domain: "appkit.rs".to_string(),
            uri: "https://appkit.rs/login".to_string(),
            statement: Some("Sign in to the demo".to_string()),
            ..Default::default()
        },
        account.caip_address.expect("not connected"),
    )
    .expect("message failed");
    let text = message.caip122_message().expect("render failed");
    let signature = client.sign_message(&text).await.expect("sign failed");
    let session = SiwxSession::new(message, signature).expect("verify failed");
    println!("signed in as {}", session.data.account);

    // Polygon is unknown to the wallet, it gets added on the way
    let selection = NetworkSelection::new(&appkit.state(), storage.as_ref());
    let polygon = chain::polygon().to_caip_network(ChainNamespace::Eip155, None);
    println!("action: {:?}", selection.network_switch_action(&polygon));
    client
        .switch_caip_network(Some(polygon))
        .await
        .expect("switch failed");
    println!("chain: {:?}", client.get_chain_id());

    let selection = NetworkSelection::new(&appkit.state(), storage.as_ref());
    for item in selection.list_networks(&appkit.get_requested_caip_networks(), "") {
        println!(
            "{} selected={} disabled={}",
            item.network.display_name(),
            item.selected,
            item.disabled
        );
    }

    client.disconnect().await.expect("disconnect failed");
}
