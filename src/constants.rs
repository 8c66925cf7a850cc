pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const WALLET_CONNECT_CONNECTOR_ID: &str = "walletConnect";
pub const INJECTED_CONNECTOR_ID: &str = "injected";

pub const WALLET_CONNECT_EXPLORER_ID: &str =
    "e7c4d26541a7fd84dbdfa9922d3ad21e936e13a7a0e44385d44f006139e44d3b";
pub const WALLET_CONNECT_IMAGE_URL: &str =
    "https://avatars.githubusercontent.com/u/37784886";

// Storage keys, kept identical to the browser localStorage keys so a
// persisted session can be shared.
pub const WALLET_ID: &str = "@w3m/wallet_id";
pub const CONNECTED_CONNECTOR: &str = "@w3m/connected_connector";
pub const SOLANA_CAIP_CHAIN_ID: &str = "@w3m/solana_caip_chain";
pub const EVM_CAIP_CHAIN_ID: &str = "@w3m/eip155_caip_chain";

pub const RELAY_URL: &str = "wss://relay.walletconnect.com";
pub const BLOCKCHAIN_API_RPC_URL: &str = "https://rpc.walletconnect.com";

pub const SOLANA_MAINNET_REF: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";
pub const SOLANA_TESTNET_REF: &str = "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z";
pub const SOLANA_DEVNET_REF: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1";

pub const LAMPORTS_DECIMALS: u8 = 9;
pub const WEI_DECIMALS: u8 = 18;

pub const SOLANA_METHODS: [&str; 2] =
    ["solana_signMessage", "solana_signTransaction"];

pub const EIP155_METHODS: [&str; 7] = [
    "personal_sign",
    "eth_sendTransaction",
    "eth_signTransaction",
    "eth_signTypedData_v4",
    "eth_accounts",
    "wallet_switchEthereumChain",
    "wallet_addEthereumChain",
];

pub const EIP155_EVENTS: [&str; 2] = ["chainChanged", "accountsChanged"];

// EIP-1193 / EIP-3085 error codes
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

pub const SIWX_VERSION: &str = "1";
pub const DID_PKH_PREFIX: &str = "did:pkh:";
