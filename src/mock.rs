//! In-memory wallet providers for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::caip::{CaipNetworkId, ChainNamespace, parse_caip_address};
use crate::connector::{ProviderEvent, WalletProvider};
use crate::rpc::{ChainRpc, JsonRpcError};
use crate::types::{Commitment, Namespace, Namespaces};
use crate::walletconnect::UniversalProvider;

type Responses = HashMap<String, VecDeque<Result<Value, JsonRpcError>>>;

pub struct MockProvider {
    name: String,
    address: Mutex<Option<String>>,
    installed: AtomicBool,
    connect_error: Mutex<Option<String>>,
    events: broadcast::Sender<ProviderEvent>,
    requests: Mutex<Vec<(String, Value)>>,
    responses: Mutex<Responses>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str, address: Option<&str>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            name: name.to_string(),
            address: Mutex::new(address.map(str::to_string)),
            installed: AtomicBool::new(true),
            connect_error: Mutex::new(None),
            events,
            requests: Mutex::new(vec![]),
            responses: Mutex::new(HashMap::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_installed(&self, installed: bool) {
        self.installed.store(installed, Ordering::SeqCst);
    }

    pub fn set_address(&self, address: Option<&str>) {
        *self.address.lock().unwrap() = address.map(str::to_string);
    }

    pub fn fail_connect(&self, message: &str) {
        *self.connect_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn respond(&self, method: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Err(JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            }));
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> anyhow::Result<Option<String>> {
        if let Some(message) = self.connect_error.lock().unwrap().clone() {
            anyhow::bail!(message);
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.address())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.emit_disconnect();
        Ok(())
    }

    fn address(&self) -> Option<String> {
        self.address.lock().unwrap().clone()
    }

    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(anyhow::Error::new(e)),
            None => Ok(Value::Null),
        }
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    fn emit_disconnect(&self) {
        self.emit(ProviderEvent::Disconnect);
    }
}

pub struct MockUniversalProvider {
    accounts: Mutex<Vec<String>>,
    session: Mutex<Option<Namespaces>>,
    proposals: Mutex<Vec<Namespaces>>,
    events: broadcast::Sender<ProviderEvent>,
    requests: Mutex<Vec<(String, Value)>>,
    responses: Mutex<Responses>,
}

impl Default for MockUniversalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUniversalProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(vec![]),
            session: Mutex::new(None),
            proposals: Mutex::new(vec![]),
            events,
            requests: Mutex::new(vec![]),
            responses: Mutex::new(HashMap::new()),
        }
    }

    /// CAIP-10 accounts the wallet approves on the next proposal.
    pub fn settle_with(&self, accounts: Vec<&str>) {
        *self.accounts.lock().unwrap() =
            accounts.into_iter().map(str::to_string).collect();
    }

    pub fn proposals(&self) -> usize {
        self.proposals.lock().unwrap().len()
    }

    pub fn last_proposal(&self) -> Option<Namespaces> {
        self.proposals.lock().unwrap().last().cloned()
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn respond(&self, method: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UniversalProvider for MockUniversalProvider {
    async fn connect(
        &self,
        namespaces: Namespaces,
        _pairing_topic: Option<String>,
    ) -> anyhow::Result<Namespaces> {
        self.emit(ProviderEvent::DisplayUri(
            "wc:7f6e504bfad60b485450578e05678ed3e8e8c4751d3c6160be17160d63ec90f9@2?relay-protocol=irn&symKey=587d5484ce2a2a6ee3ba1962fdd7e8588e06200c46823bd18fbd67def96ad303".to_string(),
        ));
        self.proposals.lock().unwrap().push(namespaces.clone());

        let accounts = self.accounts.lock().unwrap().clone();
        let mut settled = Namespaces::new();
        for account in &accounts {
            let parsed = parse_caip_address(account)?;
            let key = parsed.namespace().to_string();
            let proposed = namespaces.get(&key).cloned().unwrap_or_default();
            let entry = settled.entry(key).or_insert_with(|| Namespace {
                accounts: Some(vec![]),
                chains: vec![],
                ..proposed
            });
            let chain = parsed.network.to_string();
            if !entry.chains.contains(&chain) {
                entry.chains.push(chain);
            }
            if let Some(list) = entry.accounts.as_mut() {
                list.push(account.clone());
            }
        }

        if !settled.is_empty() {
            *self.session.lock().unwrap() = Some(settled.clone());
        }
        Ok(settled)
    }

    async fn enable(&self) -> anyhow::Result<Vec<String>> {
        let session = self.session.lock().unwrap().clone();
        let Some(session) = session else {
            anyhow::bail!("no active session");
        };
        Ok(session
            .values()
            .flat_map(|ns| ns.accounts.clone().unwrap_or_default())
            .collect())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        *self.session.lock().unwrap() = None;
        self.emit(ProviderEvent::Disconnect);
        Ok(())
    }

    async fn request(
        &self,
        method: &str,
        params: Value,
        _chain_id: Option<CaipNetworkId>,
    ) -> anyhow::Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(anyhow::Error::new(e)),
            None => Ok(Value::Null),
        }
    }

    fn session(&self) -> Option<Namespaces> {
        self.session.lock().unwrap().clone()
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Chain reads answered from memory.
pub struct MockRpc {
    balance: U256,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockRpc {
    pub fn new(balance: u64) -> Self {
        Self {
            balance: U256::from(balance),
            calls: Mutex::new(vec![]),
        }
    }

    /// `(namespace, address)` of every balance read.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_balance(
        &self,
        namespace: &ChainNamespace,
        address: &str,
        _commitment: Commitment,
    ) -> crate::error::Result<U256> {
        self.calls
            .lock()
            .unwrap()
            .push((namespace.to_string(), address.to_string()));
        Ok(self.balance)
    }
}
