use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use walletconnect_appkit::{
    AppKit, AppKitOptions, ChainNamespace, ConnectionControllerClient,
    SolanaClient,
    caip::CaipAddress,
    chain,
    connector::{AdapterFactory, AdapterKey, ProviderEvent, WalletProvider},
    controller::ConnectExternalOptions,
    default_solana_config,
    siwx::{SiwxMessage, SiwxMessageParams, SiwxSession},
    storage::FileStorage,
    types::Metadata,
};

/// Wallet holding an ed25519 key in memory, standing in for a browser
/// extension like Phantom.
struct LocalWallet {
    key: SigningKey,
    connected: Mutex<bool>,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWallet {
    fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            key: SigningKey::from_bytes(&rand::random()),
            connected: Mutex::new(false),
            events,
        }
    }

    fn pubkey(&self) -> String {
        bs58::encode(self.key.verifying_key().as_bytes()).into_string()
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    fn name(&self) -> String {
        "Phantom".to_string()
    }

    async fn connect(&self) -> anyhow::Result<Option<String>> {
        *self.connected.lock().unwrap() = true;
        let _ = self.events.send(ProviderEvent::Connect(self.pubkey()));
        Ok(Some(self.pubkey()))
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        *self.connected.lock().unwrap() = false;
        self.emit_disconnect();
        Ok(())
    }

    fn address(&self) -> Option<String> {
        self.connected.lock().unwrap().then(|| self.pubkey())
    }

    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        match method {
            "solana_signMessage" => {
                let message = params["message"]
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("message missing"))?;
                let bytes = bs58::decode(message).into_vec()?;
                let signature = self.key.sign(&bytes);
                Ok(json!({
                    "signature": bs58::encode(signature.to_bytes()).into_string()
                }))
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

    // ProjectId is required by the blockchain API RPC. You can create your
    // own from https://cloud.reown.com
    let project_id = "35d44d49c2dee217a3eb24bb4410acc7";
    let metadata = Metadata {
        name: "AppKit Rust".to_string(),
        description: "Connects a Solana wallet from Rust".to_string(),
        url: "https://github.com/zemse/walletconnect-appkit-rs".to_string(),
        icons: vec![],
    };

    let options = AppKitOptions::new(project_id)
        .with_chains(vec![chain::solana_devnet(), chain::solana()])
        .with_metadata(metadata.clone())
        .with_provider_config(default_solana_config(project_id, metadata));

    // Same role as localStorage in the browser, survives restarts
    let storage = Arc::new(
        FileStorage::open(std::env::temp_dir().join("appkit-solana.json"))
            .expect("storage failed"),
    );

    let wallet: Arc<dyn WalletProvider> = Arc::new(LocalWallet::new());
    let factory: AdapterFactory = Arc::new(move |_network: Option<&str>| {
        BTreeMap::from([(AdapterKey::Phantom, wallet.clone())])
    });

    let client = SolanaClient::new(options.clone(), storage, factory)
        .expect("client failed");
    let appkit = Arc::new(AppKit::new());
    client
        .construct(appkit.clone(), &options, None)
        .await
        .expect("construct failed");

    println!("connectors: {:?}", appkit.get_connectors());

    client
        .connect_external(ConnectExternalOptions {
            id: "phantom".to_string(),
            chain_id: None,
        })
        .await
        .expect("connect failed");

    let account = appkit.account(&ChainNamespace::Solana);
    println!("account: {account:?}");

    // Sign in with Solana
    let caip_address: CaipAddress =
        account.caip_address.expect("not connected");
    let message = SiwxMessage::new(
        SiwxMessageParams {
            domain: "appkit.rs".to_string(),
            uri: "https://appkit.rs/login".to_string(),
            statement: Some("Sign in to the demo".to_string()),
            ..Default::default()
        },
        caip_address,
    )
    .expect("message failed");
    let text = message.caip122_message().expect("render failed");
    println!("{text}");

    let signature = client.sign_message(&text).await.expect("sign failed");
    let session = SiwxSession::new(message, signature).expect("verify failed");
    println!("signed in as {}", session.data.account);

    client.disconnect().await.expect("disconnect failed");
    println!(
        "connected: {}",
        appkit.get_is_connected(&ChainNamespace::Solana)
    );
}
