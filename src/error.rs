use std::fmt;

use crate::rpc::JsonRpcError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    InvalidCaipAddress(String),
    InvalidCaipNetworkId(String),
    InvalidAddress(String),
    UnsupportedNamespace(String),
    ChainNotFound(String),
    ConnectorNotFound(String),
    ProviderNotFound(&'static str),
    NotConnected,
    MissingOption(&'static str),
    RelayProtocolNotMentioned,
    InvalidUri,
    SymKeyNotMentioned,
    PathEndNotFound,
    InvalidFrameMessage(String),
    InvalidPermissionsRequest(&'static str),
    SignatureMismatch(String),
    ParseInt(std::num::ParseIntError),
    JsonRpc(JsonRpcError),
    Provider(anyhow::Error),
    Reqwest(reqwest::Error),
    Url(url::ParseError),
    InternalError(String),
    SerdeJsonError(serde_json::Error),
    FromHexError(alloy::hex::FromHexError),
    FromUtf8Error(std::string::FromUtf8Error),
    FmtError(std::fmt::Error),
    SignatureError(alloy::primitives::SignatureError),
    Ed25519Error(ed25519_dalek::SignatureError),
    Base58Error(bs58::decode::Error),
    Base64Error(base64ct::Error),
    TimeError(time::error::Format),
    TimeParseError(time::error::Parse),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCaipAddress(s) => {
                write!(f, "Invalid CAIP-10 address: {s}")
            }
            Error::InvalidCaipNetworkId(s) => {
                write!(f, "Invalid CAIP-2 network id: {s}")
            }
            Error::InvalidAddress(s) => write!(f, "Invalid address: {s}"),
            Error::UnsupportedNamespace(s) => {
                write!(f, "Unsupported chain namespace: {s}")
            }
            Error::ChainNotFound(s) => write!(f, "Chain not found: {s}"),
            Error::ConnectorNotFound(s) => {
                write!(f, "Connector not found: {s}")
            }
            Error::ProviderNotFound(ctx) => {
                write!(f, "{ctx} - provider is undefined")
            }
            Error::NotConnected => write!(f, "No connected account"),
            Error::MissingOption(s) => write!(f, "{s} is undefined"),
            Error::RelayProtocolNotMentioned => {
                write!(f, "relay-protocol missing from pairing uri")
            }
            Error::InvalidUri => write!(f, "Invalid pairing uri"),
            Error::SymKeyNotMentioned => {
                write!(f, "symKey missing from pairing uri")
            }
            Error::PathEndNotFound => write!(f, "Pairing uri has no query"),
            Error::InvalidFrameMessage(s) => {
                write!(f, "Invalid frame message: {s}")
            }
            Error::InvalidPermissionsRequest(s) => {
                write!(f, "Invalid permissions request: {s}")
            }
            Error::SignatureMismatch(s) => {
                write!(f, "Signature does not match the address: {s}")
            }
            Error::ParseInt(e) => write!(f, "{e}"),
            Error::JsonRpc(e) => write!(f, "{e}"),
            Error::Provider(e) => write!(f, "Provider error: {e}"),
            Error::Reqwest(e) => write!(f, "{e}"),
            Error::Url(e) => write!(f, "{e}"),
            Error::InternalError(s) => write!(f, "{s}"),
            Error::SerdeJsonError(e) => write!(f, "{e}"),
            Error::FromHexError(e) => write!(f, "{e}"),
            Error::FromUtf8Error(e) => write!(f, "{e}"),
            Error::FmtError(e) => write!(f, "{e}"),
            Error::SignatureError(e) => write!(f, "{e}"),
            Error::Ed25519Error(e) => write!(f, "{e}"),
            Error::Base58Error(e) => write!(f, "{e}"),
            Error::Base64Error(e) => write!(f, "{e}"),
            Error::TimeError(e) => write!(f, "{e}"),
            Error::TimeParseError(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// JSON-RPC error code, when the error came from a wallet or node.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Error::JsonRpc(e) => Some(e.code),
            _ => None,
        }
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::InternalError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::InternalError(e)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Error::ParseInt(e)
    }
}

impl From<JsonRpcError> for Error {
    fn from(e: JsonRpcError) -> Self {
        Error::JsonRpc(e)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        // Wallets report EIP-1193 errors as JSON-RPC error objects
        match e.downcast::<JsonRpcError>() {
            Ok(e) => Error::JsonRpc(e),
            Err(e) => Error::Provider(e),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Reqwest(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Url(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerdeJsonError(e)
    }
}

impl From<alloy::hex::FromHexError> for Error {
    fn from(e: alloy::hex::FromHexError) -> Self {
        Error::FromHexError(e)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::FromUtf8Error(e)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::FmtError(e)
    }
}

impl From<alloy::primitives::SignatureError> for Error {
    fn from(e: alloy::primitives::SignatureError) -> Self {
        Error::SignatureError(e)
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        Error::Ed25519Error(e)
    }
}

impl From<bs58::decode::Error> for Error {
    fn from(e: bs58::decode::Error) -> Self {
        Error::Base58Error(e)
    }
}

impl From<base64ct::Error> for Error {
    fn from(e: base64ct::Error) -> Self {
        Error::Base64Error(e)
    }
}

impl From<time::error::Format> for Error {
    fn from(e: time::error::Format) -> Self {
        Error::TimeError(e)
    }
}

impl From<time::error::Parse> for Error {
    fn from(e: time::error::Parse) -> Self {
        Error::TimeParseError(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
