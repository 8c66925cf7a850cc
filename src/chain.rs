/// Chains
///
/// Network definitions handed in by the dApp plus the helpers that map
/// them to CAIP networks and RPC endpoints.
///
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::caip::{CaipNetworkId, ChainNamespace};
use crate::constants::{
    BLOCKCHAIN_API_RPC_URL, SOLANA_DEVNET_REF, SOLANA_MAINNET_REF,
    SOLANA_TESTNET_REF,
};
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    /// Chain reference: decimal id for EVM, genesis hash prefix for Solana
    pub chain_id: String,
    pub name: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    pub rpc_url: String,
}

impl Chain {
    pub fn caip_network_id(&self, namespace: ChainNamespace) -> CaipNetworkId {
        CaipNetworkId::new(namespace, self.chain_id.clone())
    }

    pub fn to_caip_network(
        &self,
        namespace: ChainNamespace,
        chain_images: Option<&HashMap<String, String>>,
    ) -> CaipNetwork {
        CaipNetwork {
            id: self.caip_network_id(namespace.clone()),
            name: Some(self.name.clone()),
            image_id: network_image_id(&self.chain_id).map(str::to_string),
            image_url: chain_images
                .and_then(|images| images.get(&self.chain_id))
                .cloned(),
            chain_namespace: namespace,
        }
    }

    pub fn account_explorer_url(&self, address: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|url| format!("{url}/account/{address}"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaipNetwork {
    pub id: CaipNetworkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "chain")]
    pub chain_namespace: ChainNamespace,
}

impl CaipNetwork {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Finds the configured chain a CAIP-2 id points at. Falls back to the
/// first configured chain when the id is missing or unknown.
pub fn get_chain_from_caip<'a>(
    chains: &'a [Chain],
    caip_id: Option<&str>,
) -> Option<&'a Chain> {
    let reference = caip_id.and_then(|id| id.split(':').nth(1));
    reference
        .and_then(|r| chains.iter().find(|c| c.chain_id == r))
        .or_else(|| chains.first())
}

/// Blockchain API RPC urls need the chain and project id as query
/// parameters, other RPC urls are used as they are.
pub fn detect_rpc_url(
    chain: &Chain,
    namespace: &ChainNamespace,
    project_id: &str,
) -> Result<String> {
    let url = Url::parse(&chain.rpc_url)?;
    let api = Url::parse(BLOCKCHAIN_API_RPC_URL)?;

    if url.host_str().is_some() && url.host_str() == api.host_str() {
        let mut url = url;
        url.query_pairs_mut()
            .append_pair("chainId", &format!("{namespace}:{}", chain.chain_id))
            .append_pair("projectId", project_id);
        return Ok(url.to_string());
    }

    Ok(chain.rpc_url.clone())
}

pub fn network_image_id(chain_id: &str) -> Option<&'static str> {
    Some(match chain_id {
        "1" => "692ed6ba-e569-459a-556a-776476829e00",
        "10" => "ab9c186a-c52f-464b-2906-ca59d760a400",
        "56" => "93564157-2e8e-4ce7-81df-b264dbee9b00",
        "137" => "41d04d42-da3b-4453-8506-668cc0727900",
        "8453" => "7289c336-3981-4081-c5f4-efc26ac64a00",
        "42161" => "3bff954d-5cb0-47a0-9a23-d20192e74600",
        "43114" => "30c46e53-e989-45fb-4549-be3bd4eb3b00",
        "11155111" => "e909ea0a-f92a-4512-c8fc-748044ea6800",
        SOLANA_MAINNET_REF | SOLANA_TESTNET_REF | SOLANA_DEVNET_REF => {
            "a1b58899-f671-4276-6a5e-56ca5bd59700"
        }
        _ => return None,
    })
}

pub fn solana() -> Chain {
    Chain {
        chain_id: SOLANA_MAINNET_REF.to_string(),
        name: "Solana".to_string(),
        currency: "SOL".to_string(),
        explorer_url: Some("https://solscan.io".to_string()),
        rpc_url: "https://rpc.walletconnect.com/v1".to_string(),
    }
}

pub fn solana_testnet() -> Chain {
    Chain {
        chain_id: SOLANA_TESTNET_REF.to_string(),
        name: "Solana Testnet".to_string(),
        currency: "SOL".to_string(),
        explorer_url: Some("https://explorer.solana.com/?cluster=testnet".to_string()),
        rpc_url: "https://api.testnet.solana.com".to_string(),
    }
}

pub fn solana_devnet() -> Chain {
    Chain {
        chain_id: SOLANA_DEVNET_REF.to_string(),
        name: "Solana Devnet".to_string(),
        currency: "SOL".to_string(),
        explorer_url: Some("https://explorer.solana.com/?cluster=devnet".to_string()),
        rpc_url: "https://api.devnet.solana.com".to_string(),
    }
}

pub fn ethereum() -> Chain {
    Chain {
        chain_id: "1".to_string(),
        name: "Ethereum".to_string(),
        currency: "ETH".to_string(),
        explorer_url: Some("https://etherscan.io".to_string()),
        rpc_url: "https://cloudflare-eth.com".to_string(),
    }
}

pub fn sepolia() -> Chain {
    Chain {
        chain_id: "11155111".to_string(),
        name: "Sepolia".to_string(),
        currency: "ETH".to_string(),
        explorer_url: Some("https://sepolia.etherscan.io".to_string()),
        rpc_url: "https://rpc.sepolia.org".to_string(),
    }
}

pub fn polygon() -> Chain {
    Chain {
        chain_id: "137".to_string(),
        name: "Polygon".to_string(),
        currency: "POL".to_string(),
        explorer_url: Some("https://polygonscan.com".to_string()),
        rpc_url: "https://polygon-rpc.com".to_string(),
    }
}
