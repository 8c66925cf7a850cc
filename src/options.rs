/// Options
///
/// Everything the dApp configures up front. Deserializes from the same
/// camelCase JSON shape the web SDK accepts.
///
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::constants::RELAY_URL;
use crate::error::Result;
use crate::types::{Commitment, Metadata};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub project_id: String,
    pub metadata: Metadata,
}

/// Provider configuration for Solana clients.
pub fn default_solana_config(
    project_id: impl Into<String>,
    metadata: Metadata,
) -> ProviderConfig {
    ProviderConfig {
        project_id: project_id.into(),
        metadata,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppKitOptions {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub chains: Vec<Chain>,
    #[serde(default)]
    pub default_chain: Option<Chain>,
    #[serde(default)]
    pub chain_images: HashMap<String, String>,
    #[serde(default, rename = "enableEIP6963")]
    pub enable_eip6963: Option<bool>,
    #[serde(default)]
    pub enable_auth: bool,
    #[serde(default)]
    pub connection_settings: Commitment,
    #[serde(default)]
    pub provider_config: Option<ProviderConfig>,
    #[serde(default)]
    pub relay_url: Option<String>,
}

impl AppKitOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn with_chains(mut self, chains: Vec<Chain>) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_provider_config(mut self, config: ProviderConfig) -> Self {
        self.provider_config = Some(config);
        self
    }

    pub fn with_chain_images(mut self, images: HashMap<String, String>) -> Self {
        self.chain_images = images;
        self
    }

    pub fn relay_url(&self) -> &str {
        self.relay_url.as_deref().unwrap_or(RELAY_URL)
    }

    /// EIP-6963 discovery is on unless explicitly disabled.
    pub fn eip6963_enabled(&self) -> bool {
        self.enable_eip6963 != Some(false)
    }
}
