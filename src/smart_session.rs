/// Smart sessions
///
/// ERC-7715 permission grants: the dApp asks the connected EVM wallet to
/// let a session key act on its behalf within the given permissions and
/// policies until `expiry`.
///
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::evm::{EvmClient, parse_chain_id};
use crate::utils::unix_timestamp;

pub const GRANT_PERMISSIONS_METHOD: &str = "wallet_grantPermissions";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Secp256k1,
    Secp256r1,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySigner {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub public_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeysSignerData {
    pub keys: Vec<KeySigner>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Signer {
    Keys(KeysSignerData),
}

impl Signer {
    pub fn keys(keys: Vec<KeySigner>) -> Self {
        Signer::Keys(KeysSignerData { keys })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "type")]
    pub permission_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartSessionGrantPermissionsRequest {
    /// Hex chain id, e.g. `0xaa36a7`
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Unix timestamp in seconds
    pub expiry: u64,
    pub signer: Signer,
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartSessionGrantPermissionsResponse {
    pub chain_id: String,
    pub address: String,
    pub expiry: u64,
    pub permissions: Vec<Permission>,
    /// Opaque context the wallet needs to redeem the permissions
    pub context: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmartSessionState {
    pub permissions: Vec<Permission>,
    pub permissions_context: Option<String>,
}

pub struct SmartSessionController {
    client: Arc<EvmClient>,
    state: watch::Sender<SmartSessionState>,
}

impl SmartSessionController {
    pub fn new(client: Arc<EvmClient>) -> Self {
        Self {
            client,
            state: watch::Sender::new(SmartSessionState::default()),
        }
    }

    pub fn state(&self) -> SmartSessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SmartSessionState> {
        self.state.subscribe()
    }

    /// Checks `request` against the connected account. Fills in the
    /// account address when the request leaves it out.
    pub fn validate(
        &self,
        mut request: SmartSessionGrantPermissionsRequest,
        now: u64,
    ) -> Result<SmartSessionGrantPermissionsRequest> {
        let address = self.client.get_address().ok_or(Error::NotConnected)?;
        if !self.client.store().state().is_connected {
            return Err(Error::NotConnected);
        }

        let chain_id = parse_chain_id(&request.chain_id)
            .map_err(|_| Error::InvalidPermissionsRequest("invalid chain id"))?;
        if self.client.get_chain_id() != Some(chain_id) {
            return Err(Error::InvalidPermissionsRequest(
                "chain id does not match the connected network",
            ));
        }
        if request.expiry <= now {
            return Err(Error::InvalidPermissionsRequest(
                "expiry must be in the future",
            ));
        }
        if request.permissions.is_empty() {
            return Err(Error::InvalidPermissionsRequest("no permissions requested"));
        }
        let Signer::Keys(signer) = &request.signer;
        if signer.keys.is_empty() || signer.keys.iter().any(|k| k.public_key.is_empty()) {
            return Err(Error::InvalidPermissionsRequest("signer keys are missing"));
        }

        match &request.address {
            Some(requested) if !requested.eq_ignore_ascii_case(&address) => {
                return Err(Error::InvalidPermissionsRequest(
                    "address does not match the connected account",
                ));
            }
            Some(_) => {}
            None => request.address = Some(address),
        }
        Ok(request)
    }

    pub async fn grant_permissions(
        &self,
        request: SmartSessionGrantPermissionsRequest,
    ) -> Result<SmartSessionGrantPermissionsResponse> {
        let request = self.validate(request, unix_timestamp())?;
        let provider = self
            .client
            .get_wallet_provider()
            .ok_or(Error::ProviderNotFound("smartSession:grantPermissions"))?;

        log::debug!(
            "requesting {} permissions until {}",
            request.permissions.len(),
            request.expiry
        );
        let result = provider
            .request(GRANT_PERMISSIONS_METHOD, json!([request]))
            .await?;
        let response: SmartSessionGrantPermissionsResponse =
            serde_json::from_value(result)?;

        self.state.send_replace(SmartSessionState {
            permissions: response.permissions.clone(),
            permissions_context: Some(response.context.clone()),
        });
        Ok(response)
    }

    pub fn reset(&self) {
        self.state.send_replace(SmartSessionState::default());
    }
}
