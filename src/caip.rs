/// CAIP
///
/// Chain agnostic identifiers. CAIP-2 names a network
/// (`namespace:reference`), CAIP-10 names an account on a network
/// (`namespace:reference:address`).
///
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainNamespace {
    Eip155,
    Solana,
    Polkadot,
    Bip122,
    Other(String),
}

impl ChainNamespace {
    pub fn as_str(&self) -> &str {
        match self {
            ChainNamespace::Eip155 => "eip155",
            ChainNamespace::Solana => "solana",
            ChainNamespace::Polkadot => "polkadot",
            ChainNamespace::Bip122 => "bip122",
            ChainNamespace::Other(s) => s,
        }
    }
}

impl Display for ChainNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ChainNamespace {
    fn from(s: &str) -> Self {
        match s {
            "eip155" => ChainNamespace::Eip155,
            "solana" => ChainNamespace::Solana,
            "polkadot" => ChainNamespace::Polkadot,
            "bip122" => ChainNamespace::Bip122,
            other => ChainNamespace::Other(other.to_string()),
        }
    }
}

impl FromStr for ChainNamespace {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::UnsupportedNamespace(s.to_string()));
        }
        Ok(ChainNamespace::from(s))
    }
}

/// CAIP-2 network identifier, e.g. `eip155:1` or
/// `solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaipNetworkId {
    pub namespace: ChainNamespace,
    pub reference: String,
}

impl CaipNetworkId {
    pub fn new(namespace: ChainNamespace, reference: impl Into<String>) -> Self {
        Self {
            namespace,
            reference: reference.into(),
        }
    }

    pub fn eip155(chain_id: u64) -> Self {
        Self::new(ChainNamespace::Eip155, chain_id.to_string())
    }

    pub fn solana(reference: impl Into<String>) -> Self {
        Self::new(ChainNamespace::Solana, reference)
    }

    /// Numeric chain id for `eip155` networks.
    pub fn eip155_chain_id(&self) -> Option<u64> {
        match self.namespace {
            ChainNamespace::Eip155 => self.reference.parse().ok(),
            _ => None,
        }
    }

    pub fn with_address(&self, address: impl Into<String>) -> CaipAddress {
        CaipAddress {
            network: self.clone(),
            address: address.into(),
        }
    }
}

impl Display for CaipNetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl FromStr for CaipNetworkId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_caip_network_id(s)
    }
}

/// CAIP-10 account identifier, e.g.
/// `eip155:1:0xab16a96D359eC26a11e2C2b3d8f8B8942d5Bfcdb`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaipAddress {
    pub network: CaipNetworkId,
    pub address: String,
}

impl CaipAddress {
    pub fn namespace(&self) -> &ChainNamespace {
        &self.network.namespace
    }

    pub fn chain_id(&self) -> &str {
        &self.network.reference
    }
}

impl Display for CaipAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.network, self.address)
    }
}

impl FromStr for CaipAddress {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_caip_address(s)
    }
}

pub fn parse_caip_address(caip_address: &str) -> Result<CaipAddress> {
    let parts: Vec<&str> = caip_address.split(':').collect();
    let [namespace, reference, address] = parts.as_slice() else {
        return Err(Error::InvalidCaipAddress(caip_address.to_string()));
    };

    if namespace.is_empty() || reference.is_empty() || address.is_empty() {
        return Err(Error::InvalidCaipAddress(caip_address.to_string()));
    }

    Ok(CaipAddress {
        network: CaipNetworkId::new(ChainNamespace::from(*namespace), *reference),
        address: address.to_string(),
    })
}

pub fn parse_caip_network_id(caip_network_id: &str) -> Result<CaipNetworkId> {
    let mut parts = caip_network_id.split(':');
    let namespace = parts.next().unwrap_or_default();
    let reference = parts.next().unwrap_or_default();

    if namespace.is_empty() || reference.is_empty() {
        return Err(Error::InvalidCaipNetworkId(caip_network_id.to_string()));
    }

    Ok(CaipNetworkId::new(ChainNamespace::from(namespace), reference))
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s: String = Deserialize::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(ChainNamespace);
string_serde!(CaipNetworkId);
string_serde!(CaipAddress);
