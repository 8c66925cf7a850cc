/// Sign in with X
///
/// CAIP-122 sign-in messages for EVM (SIWE) and Solana (SIWS) accounts.
/// Wallets produce the signatures, this module renders the text they sign
/// and checks the result against the account.
///
use std::fmt::{self, Display, Write};
use std::str::FromStr;

use alloy::primitives::Address;
use alloy::signers::Signature;
use ed25519_dalek::{Verifier, VerifyingKey};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::caip::{CaipAddress, ChainNamespace, parse_caip_address};
use crate::constants::{DID_PKH_PREFIX, SIWX_VERSION};
use crate::error::{Error, Result};

/// What the dApp decides about a sign-in; the account half comes from the
/// wallet connection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiwxMessageParams {
    pub domain: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiwxMessage {
    pub domain: String,
    #[serde(rename = "aud")]
    pub uri: String,
    pub version: String,
    pub statement: Option<String>,
    pub nonce: String,
    #[serde(rename = "iat")]
    pub issued_at: String,
    #[serde(rename = "exp")]
    pub expiration_time: Option<String>,
    #[serde(rename = "nbf")]
    pub not_before: Option<String>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
    #[serde(rename = "iss")]
    pub account: Did,
}

impl SiwxMessage {
    pub fn new(params: SiwxMessageParams, account: CaipAddress) -> Result<Self> {
        match account.namespace() {
            ChainNamespace::Eip155 | ChainNamespace::Solana => {}
            other => return Err(Error::UnsupportedNamespace(other.to_string())),
        }
        Ok(Self {
            domain: params.domain,
            uri: params.uri,
            version: SIWX_VERSION.to_string(),
            statement: params.statement,
            nonce: generate_nonce(),
            issued_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            expiration_time: params.expiration_time,
            not_before: params.not_before,
            request_id: params.request_id,
            resources: params.resources,
            account: Did(account),
        })
    }

    pub fn caip_address(&self) -> &CaipAddress {
        &self.account.0
    }

    fn chain_name(&self) -> &'static str {
        match self.caip_address().namespace() {
            ChainNamespace::Solana => "Solana",
            _ => "Ethereum",
        }
    }

    /// The text the wallet signs.
    pub fn caip122_message(&self) -> Result<String> {
        let account = self.caip_address();
        let mut message = format!(
            "{} wants you to sign in with your {} account:\n{}\n\n",
            self.domain,
            self.chain_name(),
            account.address
        );

        if let Some(statement) = &self.statement {
            writeln!(message, "{statement}\n")?;
        }

        write!(
            message,
            "URI: {}\nVersion: {}\nChain ID: {}\nNonce: {}\nIssued At: {}",
            self.uri,
            self.version,
            account.chain_id(),
            self.nonce,
            self.issued_at,
        )?;

        if let Some(expiration_time) = &self.expiration_time {
            write!(message, "\nExpiration Time: {expiration_time}")?;
        }

        if let Some(not_before) = &self.not_before {
            write!(message, "\nNot Before: {not_before}")?;
        }

        if let Some(request_id) = &self.request_id {
            write!(message, "\nRequest ID: {request_id}")?;
        }

        if !self.resources.is_empty() {
            write!(message, "\nResources:")?;
            for resource in &self.resources {
                write!(message, "\n- {resource}")?;
            }
        }

        Ok(message)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> Result<bool> {
        match &self.expiration_time {
            Some(exp) => Ok(OffsetDateTime::parse(exp, &Rfc3339)? <= now),
            None => Ok(false),
        }
    }

    /// Checks `signature` against the account of the message. EVM
    /// signatures are hex EIP-191 signatures, Solana ones base58 ed25519.
    pub fn verify(&self, signature: &str) -> Result<()> {
        let message = self.caip122_message()?;
        let account = self.caip_address();
        match account.namespace() {
            ChainNamespace::Eip155 => {
                let expected = Address::from_str(&account.address)
                    .map_err(|_| Error::InvalidAddress(account.address.clone()))?;
                let recovered = Signature::from_str(signature)?
                    .recover_address_from_msg(message)?;
                if recovered != expected {
                    return Err(Error::SignatureMismatch(recovered.to_string()));
                }
                Ok(())
            }
            ChainNamespace::Solana => {
                let public_key: [u8; 32] = bs58::decode(&account.address)
                    .into_vec()?
                    .try_into()
                    .map_err(|_| Error::InvalidAddress(account.address.clone()))?;
                let signature: [u8; 64] = bs58::decode(signature)
                    .into_vec()?
                    .try_into()
                    .map_err(|_| {
                        Error::SignatureMismatch("bad signature length".to_string())
                    })?;
                VerifyingKey::from_bytes(&public_key)?
                    .verify(
                        message.as_bytes(),
                        &ed25519_dalek::Signature::from_bytes(&signature),
                    )
                    .map_err(|_| Error::SignatureMismatch(account.address.clone()))
            }
            other => Err(Error::UnsupportedNamespace(other.to_string())),
        }
    }
}

/// A verified sign-in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiwxSession {
    pub data: SiwxMessage,
    pub message: String,
    pub signature: String,
}

impl SiwxSession {
    pub fn new(data: SiwxMessage, signature: impl Into<String>) -> Result<Self> {
        let signature = signature.into();
        data.verify(&signature)?;
        Ok(Self {
            message: data.caip122_message()?,
            data,
            signature,
        })
    }
}

/// Alphanumeric nonce, 32 characters as CAIP-122 requires at least eight.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// `did:pkh` identifier of a CAIP-10 account.
#[derive(Clone, Debug, PartialEq)]
pub struct Did(pub CaipAddress);

impl Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DID_PKH_PREFIX}{}", self.0)
    }
}

impl FromStr for Did {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caip = s
            .strip_prefix(DID_PKH_PREFIX)
            .ok_or_else(|| Error::InvalidCaipAddress(s.to_string()))?;
        Ok(Did(parse_caip_address(caip)?))
    }
}

impl Serialize for Did {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
