#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, B256, U256};

use wallet_session_core::{
    ChainClientPort, EventSink, NetworkDescriptor, NetworkRegistry, PortError, ProviderEvent,
    ProviderEventKind, ProviderPort, SessionManager,
};

#[derive(Debug, Default)]
struct MockProviderState {
    available: bool,
    accounts: Vec<Address>,
    chain_id: u64,
    calls: Vec<String>,
    added: Vec<NetworkDescriptor>,
    failures: HashMap<&'static str, PortError>,
    sinks: Vec<(ProviderEventKind, EventSink)>,
    event_seq: u64,
}

/// Scriptable provider that records every call it receives.
#[derive(Debug, Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockProviderState>>,
}

impl MockProvider {
    pub fn installed(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockProviderState {
                available: true,
                accounts,
                chain_id,
                ..MockProviderState::default()
            })),
        }
    }

    pub fn missing() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockProviderState::default())),
        }
    }

    pub fn fail(&self, method: &'static str, error: PortError) {
        self.state
            .lock()
            .expect("mock lock")
            .failures
            .insert(method, error);
    }

    pub fn clear_failure(&self, method: &'static str) {
        self.state.lock().expect("mock lock").failures.remove(method);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("mock lock").calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == method).count()
    }

    pub fn added(&self) -> Vec<NetworkDescriptor> {
        self.state.lock().expect("mock lock").added.clone()
    }

    pub fn emit_accounts(&self, accounts: Vec<Address>) {
        let mut g = self.state.lock().expect("mock lock");
        g.accounts = accounts.clone();
        g.event_seq += 1;
        let event = ProviderEvent::accounts_changed(g.event_seq, &accounts);
        emit(&g, event);
    }

    pub fn emit_chain(&self, chain_id: u64) {
        let mut g = self.state.lock().expect("mock lock");
        g.chain_id = chain_id;
        g.event_seq += 1;
        let event = ProviderEvent::chain_changed(g.event_seq, chain_id);
        emit(&g, event);
    }

    pub fn emit_raw(&self, event: ProviderEvent) {
        let g = self.state.lock().expect("mock lock");
        emit(&g, event);
    }

    fn enter(&self, method: &'static str) -> Result<(), PortError> {
        let mut g = self.state.lock().expect("mock lock");
        g.calls.push(method.to_owned());
        match g.failures.get(method) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn emit(state: &MockProviderState, event: ProviderEvent) {
    for (kind, sink) in &state.sinks {
        if *kind == event.kind {
            let _ = sink.send(event.clone());
        }
    }
}

impl ProviderPort for MockProvider {
    fn is_available(&self) -> bool {
        self.state.lock().expect("mock lock").available
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.enter("request_accounts")?;
        Ok(self.state.lock().expect("mock lock").accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        self.enter("chain_id")?;
        Ok(self.state.lock().expect("mock lock").chain_id)
    }

    async fn send_transaction(
        &self,
        _from: Address,
        _to: Address,
        _value: U256,
    ) -> Result<B256, PortError> {
        self.enter("send_transaction")?;
        Ok(B256::repeat_byte(0xab))
    }

    async fn sign_message(&self, _from: Address, message: &str) -> Result<Bytes, PortError> {
        self.enter("sign_message")?;
        let mut sig = vec![0x11; 64];
        sig.push(message.len() as u8);
        Ok(Bytes::from(sig))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        self.enter("switch_chain")?;
        self.state.lock().expect("mock lock").chain_id = chain_id;
        Ok(())
    }

    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<(), PortError> {
        self.enter("add_chain")?;
        let mut g = self.state.lock().expect("mock lock");
        g.added.push(descriptor.clone());
        g.chain_id = descriptor.chain_id;
        Ok(())
    }

    fn subscribe(&self, kind: ProviderEventKind, sink: EventSink) -> Result<(), PortError> {
        self.state
            .lock()
            .expect("mock lock")
            .sinks
            .push((kind, sink));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MockChainState {
    balances: HashMap<Address, U256>,
    queried: Vec<Address>,
    offline: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockChainClient {
    state: Arc<Mutex<MockChainState>>,
}

impl MockChainClient {
    pub fn with_balance(self, address: Address, wei: U256) -> Self {
        self.state
            .lock()
            .expect("chain lock")
            .balances
            .insert(address, wei);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().expect("chain lock").offline = offline;
    }

    pub fn queried(&self) -> Vec<Address> {
        self.state.lock().expect("chain lock").queried.clone()
    }
}

impl ChainClientPort for MockChainClient {
    async fn get_balance(&self, address: Address) -> Result<U256, PortError> {
        let mut g = self.state.lock().expect("chain lock");
        g.queried.push(address);
        if g.offline {
            return Err(PortError::Network("connection refused".to_owned()));
        }
        Ok(g.balances.get(&address).copied().unwrap_or_default())
    }
}

pub type TestManager = SessionManager<MockProvider, MockChainClient>;

pub fn new_manager(provider: &MockProvider, chain: &MockChainClient) -> TestManager {
    SessionManager::new(provider.clone(), chain.clone(), NetworkRegistry::builtin())
        .expect("session manager")
}

pub fn account_a() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("account a")
}

pub fn account_b() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("account b")
}

pub fn recipient() -> Address {
    "0x000000000000000000000000000000000000BEEF"
        .parse()
        .expect("recipient")
}

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}
