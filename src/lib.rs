//! # walletconnect-appkit
//!
//! Wallet connection layer for multi-chain dApps, modelled after
//! [Reown AppKit](https://docs.reown.com/appkit/overview).
//!
//! ## Features
//! - Solana and EVM chain clients behind one controller contract
//! - Injected, EIP-6963 announced and WalletConnect providers
//! - Connection state kept in sync with wallet events
//! - CAIP-2 / CAIP-10 parsing, SIWE / SIWS messages
//!
//! ## Example
//!
//! ```ignore
//! // Get project_id from https://cloud.reown.com
//! let options = AppKitOptions::new("xxxx")
//!     .with_chains(vec![chain::solana(), chain::solana_devnet()])
//!     .with_metadata(Metadata {
//!         name: "My dApp".to_string(),
//!         description: "My dApp talks to wallets".to_string(),
//!         url: "https://my-dapp.com".to_string(),
//!         icons: vec![],
//!     })
//!     .with_provider_config(default_solana_config("xxxx", metadata));
//!
//! let storage = Arc::new(FileStorage::open("appkit.json")?);
//! let client = SolanaClient::new(options.clone(), storage, adapter_factory)?;
//!
//! let appkit = Arc::new(AppKit::new());
//! client.construct(appkit.clone(), &options, Some(universal_provider)).await?;
//!
//! client
//!     .connect_external(ConnectExternalOptions {
//!         id: "phantom".to_string(),
//!         chain_id: None,
//!     })
//!     .await?;
//!
//! let mut state = appkit.subscribe();
//! while state.changed().await.is_ok() {
//!     println!("{:?}", state.borrow().accounts);
//! }
//! ```
//!
//! ## License
//! MIT OR Apache-2.0

pub mod appkit;
pub mod caip;
pub mod chain;
pub mod connector;
pub mod constants;
pub mod controller;
pub mod error;
pub mod evm;
pub mod frame;
pub mod network;
pub mod options;
pub mod rpc;
pub mod siwx;
pub mod smart_session;
pub mod solana;
pub mod storage;
pub mod store;
pub mod types;
pub mod utils;
pub mod walletconnect;

#[cfg(test)]
mod mock;

/// Exposed for easy access
pub use appkit::AppKit;
pub use caip::{CaipAddress, CaipNetworkId, ChainNamespace};
pub use controller::{ConnectionControllerClient, NetworkControllerClient};
pub use error::Error;
pub use evm::EvmClient;
pub use options::{AppKitOptions, default_solana_config};
pub use solana::SolanaClient;
