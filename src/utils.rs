use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::hex;
use base64ct::{Base64, Encoding};
use url::form_urlencoded;

use crate::error::{Error, Result};

/// Parameters of a `wc:` pairing uri.
#[derive(Clone, Debug, PartialEq)]
pub struct UriParameters {
    pub protocol: String,
    pub topic: String,
    pub version: u32,
    pub sym_key: [u8; 32],
    pub relay: RelayProtocolOptions,
    pub methods: Option<Vec<String>>,
    pub expiry_timestamp: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelayProtocolOptions {
    pub protocol: String,
    pub data: Option<String>,
}

impl TryFrom<String> for UriParameters {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        parse_uri(value)
    }
}

impl UriParameters {
    /// Renders the uri back into its `wc:` form.
    pub fn to_uri(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("relay-protocol", &self.relay.protocol);
        if let Some(data) = &self.relay.data {
            query.append_pair("relay-data", data);
        }
        query.append_pair("symKey", &hex::encode(self.sym_key));
        if let Some(expiry) = self.expiry_timestamp {
            query.append_pair("expiryTimestamp", &expiry.to_string());
        }
        if let Some(methods) = &self.methods {
            query.append_pair("methods", &methods.join(","));
        }
        format!("wc:{}@{}?{}", self.topic, self.version, query.finish())
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry_timestamp.is_some_and(|expiry| expiry <= now)
    }
}

pub fn parse_uri(mut input: String) -> Result<UriParameters> {
    if !input.contains("wc:") {
        if let Ok(decoded_bytes) = Base64::decode_vec(&input) {
            if let Ok(decoded_str) = String::from_utf8(decoded_bytes) {
                if decoded_str.contains("wc:") {
                    input = decoded_str;
                }
            }
        }
    }

    // Strip schema prefixes
    if input.contains("wc://") {
        input = input.replacen("wc://", "", 1);
    } else if input.contains("wc:") {
        input = input.replacen("wc:", "", 1);
    } else {
        return Err(Error::InvalidUri);
    }

    let path_end = input.find('?').ok_or(Error::PathEndNotFound)?;
    let path = &input[..path_end];
    let query_string = &input[path_end + 1..];

    let required_values: Vec<&str> = path.split('@').collect();
    let [topic, version] = required_values.as_slice() else {
        return Err(Error::InvalidUri);
    };

    let mut query_params: HashMap<String, String> = HashMap::new();
    for (key, value) in form_urlencoded::parse(query_string.as_bytes()) {
        query_params.insert(key.into(), value.into());
    }

    let methods = query_params
        .get("methods")
        .map(|m| m.split(',').map(|s| s.to_string()).collect());

    let sym_key = query_params
        .get("symKey")
        .ok_or(Error::SymKeyNotMentioned)?;

    Ok(UriParameters {
        protocol: "wc".to_string(),
        topic: parse_topic(topic),
        version: version.parse()?,
        sym_key: hex::decode_to_array::<&String, 32>(sym_key)?,
        relay: parse_relay_params(&query_params)?,
        methods,
        expiry_timestamp: query_params
            .get("expiryTimestamp")
            .and_then(|v| v.parse().ok()),
    })
}

pub fn parse_topic(topic: &str) -> String {
    topic.strip_prefix("//").unwrap_or(topic).to_string()
}

pub fn parse_relay_params(
    params: &HashMap<String, String>,
) -> Result<RelayProtocolOptions> {
    let protocol_key = "relay-protocol";
    let data_key = "relay-data";

    let protocol = params
        .get(protocol_key)
        .ok_or(Error::RelayProtocolNotMentioned)?
        .clone();
    let data = params.get(data_key).cloned();

    Ok(RelayProtocolOptions { protocol, data })
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
