use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use serde_json::Value;
use tracing::{debug, info};

use wallet_session_core::{
    chain_id_hex, json_chain_id_to_u64, EventSink, NetworkDescriptor, PortError, ProviderEvent,
    ProviderEventKind, ProviderMethod, ProviderPort, ProviderRpcError,
};

use crate::WalletAdapterConfig;

#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
    #[cfg(target_arch = "wasm32")]
    hooks: Arc<Mutex<BrowserHooks>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

/// Last known wallet state. `None` means not observed yet.
#[derive(Debug, Default)]
struct ProviderState {
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
    known_chains: BTreeSet<u64>,
    rejections: HashMap<&'static str, ProviderRpcError>,
    tx_count: u64,
    event_seq: u64,
    sinks: Vec<(ProviderEventKind, EventSink)>,
}

impl ProviderState {
    fn simulated() -> Self {
        Self {
            accounts: Some(vec![address!("1000000000000000000000000000000000000001")]),
            chain_id: Some(1),
            known_chains: BTreeSet::from([1]),
            ..Self::default()
        }
    }

    fn emit(&mut self, kind: ProviderEventKind, build: impl FnOnce(u64) -> ProviderEvent) {
        self.event_seq = self.event_seq.saturating_add(1);
        let event = build(self.event_seq);
        // Closed receivers are pruned so dropped sessions stop accumulating.
        self.sinks
            .retain(|(k, sink)| *k != kind || sink.send(event.clone()).is_ok());
    }

    /// Wallet-announced accounts; emits whenever they differ from what is known.
    fn set_accounts(&mut self, accounts: Vec<Address>) {
        if self.accounts.as_ref() != Some(&accounts) {
            self.emit(ProviderEventKind::AccountsChanged, |seq| {
                ProviderEvent::accounts_changed(seq, &accounts)
            });
            self.accounts = Some(accounts);
        }
    }

    fn set_chain_id(&mut self, chain_id: u64) {
        if self.chain_id != Some(chain_id) {
            self.chain_id = Some(chain_id);
            self.emit(ProviderEventKind::ChainChanged, |seq| {
                ProviderEvent::chain_changed(seq, chain_id)
            });
        }
    }

    /// Accounts read back from a request; only a change from an observed value is an event.
    fn record_accounts(&mut self, accounts: Vec<Address>) {
        if self.accounts.is_some() {
            self.set_accounts(accounts);
        } else {
            self.accounts = Some(accounts);
        }
    }

    fn record_chain_id(&mut self, chain_id: u64) {
        if self.chain_id.is_some() {
            self.set_chain_id(chain_id);
        } else {
            self.chain_id = Some(chain_id);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
struct BrowserHooks {
    accounts_changed: Option<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
    chain_changed: Option<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(WalletAdapterConfig::from_env())
    }
}

impl Eip1193Adapter {
    /// Adapter for the wallet available in this environment. Without one the adapter is
    /// disabled and reports no provider.
    pub fn with_config(config: WalletAdapterConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = {
            let _ = config;
            if browser_provider_available() {
                ProviderMode::Browser
            } else {
                ProviderMode::Disabled("no injected EIP-1193 provider found".to_owned())
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = match config.eip1193_proxy_url {
            // No timeout: requests wait for the user to answer in the wallet UI.
            Some(base_url) => match reqwest::Client::builder().build() {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime { base_url, client }),
                Err(e) => ProviderMode::Disabled(format!(
                    "failed to initialize EIP-1193 proxy client: {e}"
                )),
            },
            None => ProviderMode::Disabled("EIP-1193 proxy URL not configured".to_owned()),
        };

        debug!(mode = mode_name(&mode), "eip1193 adapter initialized");
        Self::from_mode(mode)
    }

    /// In-process wallet with scriptable behaviour, for tests and local development.
    pub fn deterministic() -> Self {
        Self::from_mode(ProviderMode::Deterministic)
    }

    /// Adapter for an environment without any injected provider.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::from_mode(ProviderMode::Disabled(reason.into()))
    }

    fn from_mode(mode: ProviderMode) -> Self {
        let state = if matches!(mode, ProviderMode::Deterministic) {
            ProviderState::simulated()
        } else {
            ProviderState::default()
        };
        Self {
            mode,
            state: Arc::new(Mutex::new(state)),
            #[cfg(target_arch = "wasm32")]
            hooks: Arc::new(Mutex::new(BrowserHooks::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::ProviderUnavailable(reason.clone()));
        }
        Ok(())
    }

    /// Returns `Ok(None)` when the call must be answered by the deterministic wallet.
    async fn remote(&self, method: ProviderMethod, params: Value) -> Result<Option<Value>, PortError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => proxy_call(proxy, method, params).await.map(Some),
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => wasm_request(method, params).await.map(Some),
            _ => {
                let g = self.lock()?;
                match g.rejections.get(method.rpc_name()) {
                    Some(err) => Err(err.clone().into_port_error(method)),
                    None => Ok(None),
                }
            }
        }
    }

    pub fn debug_reject(&self, method: &'static str, error: ProviderRpcError) -> Result<(), PortError> {
        self.lock()?.rejections.insert(method, error);
        Ok(())
    }

    pub fn debug_clear_rejection(&self, method: &str) -> Result<(), PortError> {
        self.lock()?.rejections.remove(method);
        Ok(())
    }

    pub fn debug_set_known_chains(&self, chains: impl IntoIterator<Item = u64>) -> Result<(), PortError> {
        self.lock()?.known_chains = chains.into_iter().collect();
        Ok(())
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.lock()?.set_accounts(accounts);
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.known_chains.insert(chain_id);
        g.set_chain_id(chain_id);
        Ok(())
    }

    /// Re-reads accounts and chain from a proxied wallet and emits events for any change.
    /// Other runtimes deliver wallet events on their own, so this is a no-op for them.
    pub async fn poll_wallet_state(&self) -> Result<(), PortError> {
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => {
                let accounts =
                    proxy_call(proxy, ProviderMethod::Accounts, serde_json::json!([])).await?;
                let accounts = parse_accounts(ProviderMethod::Accounts, &accounts)?;
                let chain_id =
                    proxy_call(proxy, ProviderMethod::ChainId, serde_json::json!([])).await?;
                let chain_id = json_chain_id_to_u64(&chain_id)?;

                let mut g = self.lock()?;
                g.record_accounts(accounts);
                g.record_chain_id(chain_id);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn deterministic_signature(&self, from: Address, message: &str) -> Bytes {
        let mut seed = Vec::new();
        seed.extend_from_slice(b"personal_sign");
        seed.extend_from_slice(from.as_slice());
        seed.extend_from_slice(message.as_bytes());
        let hash = keccak256(seed);
        let mut sig = Vec::with_capacity(65);
        sig.extend_from_slice(hash.as_slice());
        sig.extend_from_slice(hash.as_slice());
        sig.push(27);
        Bytes::from(sig)
    }

    #[cfg(target_arch = "wasm32")]
    fn register_browser_hooks(&self) -> Result<(), PortError> {
        use wasm_bindgen::{closure::Closure, JsCast, JsValue};

        let provider = browser_provider()?;
        let on_fn = get_prop(&provider, "on")
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
            .or_else(|| {
                get_prop(&provider, "addListener")
                    .ok()
                    .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
            })
            .ok_or_else(|| {
                PortError::ProviderUnavailable("provider does not expose on/addListener".to_owned())
            })?;

        let mut hooks = self
            .hooks
            .lock()
            .map_err(|e| PortError::Transport(format!("provider hooks lock poisoned: {e}")))?;
        if hooks.accounts_changed.is_some() && hooks.chain_changed.is_some() {
            return Ok(());
        }

        let state_for_accounts = Arc::clone(&self.state);
        let accounts_cb = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let mut accounts = Vec::new();
            if js_sys::Array::is_array(&value) {
                for item in js_sys::Array::from(&value).iter() {
                    if let Some(addr) = item.as_string().and_then(|s| s.parse::<Address>().ok()) {
                        accounts.push(addr);
                    }
                }
            }
            if let Ok(mut g) = state_for_accounts.lock() {
                g.set_accounts(accounts);
            }
        });

        let state_for_chain = Arc::clone(&self.state);
        let chain_cb = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            if let Ok(chain_id) = js_chain_id_to_u64(value) {
                if let Ok(mut g) = state_for_chain.lock() {
                    g.set_chain_id(chain_id);
                }
            }
        });

        on_fn
            .call2(
                &provider,
                &JsValue::from_str(ProviderEventKind::AccountsChanged.event_name()),
                accounts_cb.as_ref().unchecked_ref(),
            )
            .map_err(|e| PortError::Transport(format!("register accountsChanged failed: {e:?}")))?;
        on_fn
            .call2(
                &provider,
                &JsValue::from_str(ProviderEventKind::ChainChanged.event_name()),
                chain_cb.as_ref().unchecked_ref(),
            )
            .map_err(|e| PortError::Transport(format!("register chainChanged failed: {e:?}")))?;

        hooks.accounts_changed = Some(accounts_cb);
        hooks.chain_changed = Some(chain_cb);
        Ok(())
    }
}

impl ProviderPort for Eip1193Adapter {
    fn is_available(&self) -> bool {
        match &self.mode {
            ProviderMode::Disabled(_) => false,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser_provider_available(),
            _ => true,
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        let method = ProviderMethod::RequestAccounts;
        let Some(result) = self.remote(method, serde_json::json!([])).await? else {
            return Ok(self.lock()?.accounts.clone().unwrap_or_default());
        };
        let accounts = parse_accounts(method, &result)?;
        self.lock()?.record_accounts(accounts.clone());
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        let method = ProviderMethod::ChainId;
        let Some(result) = self.remote(method, serde_json::json!([])).await? else {
            let g = self.lock()?;
            return g
                .chain_id
                .ok_or_else(|| PortError::ProviderUnavailable("wallet chain not known".to_owned()));
        };
        let chain_id = json_chain_id_to_u64(&result)?;
        self.lock()?.record_chain_id(chain_id);
        Ok(chain_id)
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<B256, PortError> {
        let method = ProviderMethod::SendTransaction;
        let params = serde_json::json!([{
            "from": from.to_string(),
            "to": to.to_string(),
            "value": format!("0x{value:x}"),
        }]);
        let Some(result) = self.remote(method, params).await? else {
            let mut g = self.lock()?;
            if !g.accounts.as_ref().is_some_and(|a| a.contains(&from)) {
                return Err(PortError::SubmissionFailed(format!(
                    "account {from} is not authorized"
                )));
            }
            g.tx_count = g.tx_count.saturating_add(1);
            let mut seed = Vec::new();
            seed.extend_from_slice(from.as_slice());
            seed.extend_from_slice(to.as_slice());
            seed.extend_from_slice(&value.to_be_bytes::<32>());
            seed.extend_from_slice(&g.chain_id.unwrap_or_default().to_be_bytes());
            seed.extend_from_slice(&g.tx_count.to_be_bytes());
            return Ok(keccak256(seed));
        };
        let hash = result.as_str().ok_or_else(|| {
            PortError::SubmissionFailed("eth_sendTransaction must return a hash".to_owned())
        })?;
        hash.parse::<B256>()
            .map_err(|e| PortError::Validation(format!("invalid tx hash: {e}")))
    }

    async fn sign_message(&self, from: Address, message: &str) -> Result<Bytes, PortError> {
        let method = ProviderMethod::PersonalSign;
        let payload_hex = format!("0x{}", alloy::hex::encode(message.as_bytes()));
        let params = serde_json::json!([payload_hex, from.to_string()]);
        let Some(result) = self.remote(method, params).await? else {
            return Ok(self.deterministic_signature(from, message));
        };
        let sig_raw = result.as_str().ok_or_else(|| {
            PortError::Transport("personal_sign must return a hex string".to_owned())
        })?;
        sig_raw
            .parse::<Bytes>()
            .map_err(|e| PortError::Validation(format!("invalid signature hex: {e}")))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        let method = ProviderMethod::SwitchChain(chain_id);
        let params = serde_json::json!([{ "chainId": chain_id_hex(chain_id) }]);
        if self.remote(method, params).await?.is_none() {
            let mut g = self.lock()?;
            if !g.known_chains.contains(&chain_id) {
                return Err(ProviderRpcError::unrecognized_chain(chain_id).into_port_error(method));
            }
            g.set_chain_id(chain_id);
        }
        info!(chain_id, "wallet switched chain");
        Ok(())
    }

    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<(), PortError> {
        let method = ProviderMethod::AddChain(descriptor.chain_id);
        let params = serde_json::json!([descriptor.add_chain_params()]);
        if self.remote(method, params).await?.is_none() {
            let mut g = self.lock()?;
            g.known_chains.insert(descriptor.chain_id);
            // Wallets switch to a freshly added chain.
            g.set_chain_id(descriptor.chain_id);
        }
        info!(chain_id = descriptor.chain_id, name = %descriptor.display_name, "wallet added chain");
        Ok(())
    }

    fn subscribe(&self, kind: ProviderEventKind, sink: EventSink) -> Result<(), PortError> {
        self.check_mode()?;
        #[cfg(target_arch = "wasm32")]
        {
            if matches!(self.mode, ProviderMode::Browser) {
                self.register_browser_hooks()?;
            }
        }
        self.lock()?.sinks.push((kind, sink));
        debug!(event = kind.event_name(), "provider event subscribed");
        Ok(())
    }
}

fn mode_name(mode: &ProviderMode) -> &'static str {
    match mode {
        ProviderMode::Disabled(_) => "disabled",
        ProviderMode::Deterministic => "deterministic",
        #[cfg(not(target_arch = "wasm32"))]
        ProviderMode::Proxy(_) => "proxy",
        #[cfg(target_arch = "wasm32")]
        ProviderMode::Browser => "browser",
    }
}

fn parse_accounts(method: ProviderMethod, result: &Value) -> Result<Vec<Address>, PortError> {
    let name = method.rpc_name();
    let arr = result
        .as_array()
        .ok_or_else(|| PortError::Transport(format!("{name}: array expected")))?;
    arr.iter()
        .map(|item| {
            let raw = item
                .as_str()
                .ok_or_else(|| PortError::Transport(format!("{name}: string expected")))?;
            raw.parse()
                .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))
        })
        .collect()
}

fn rpc_error_from_json(err: &Value) -> ProviderRpcError {
    let code = err.get("code").and_then(Value::as_i64).unwrap_or(-32603);
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("provider error")
        .to_owned();
    ProviderRpcError::new(code, message)
}

#[cfg(not(target_arch = "wasm32"))]
async fn proxy_call(
    proxy: &ProxyRuntime,
    method: ProviderMethod,
    params: Value,
) -> Result<Value, PortError> {
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method.rpc_name(),
        "params": params,
    });
    let response = proxy
        .client
        .post(&proxy.base_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| PortError::ProviderUnavailable(format!("eip1193 proxy request failed: {e}")))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| PortError::Transport(format!("eip1193 proxy json decode failed: {e}")))?;
    if let Some(err) = body.get("error") {
        return Err(rpc_error_from_json(err).into_port_error(method));
    }
    if !status.is_success() {
        return Err(PortError::Transport(format!(
            "eip1193 proxy status {status}: {body}"
        )));
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| PortError::Transport("eip1193 proxy missing result".to_owned()))
}

#[cfg(target_arch = "wasm32")]
async fn wasm_request(method: ProviderMethod, params: Value) -> Result<Value, PortError> {
    use serde::Serialize;
    use wasm_bindgen::JsCast;

    let provider = browser_provider()?;
    let request_fn = get_prop(&provider, "request")
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
        .ok_or_else(|| {
            PortError::ProviderUnavailable("window.ethereum.request is unavailable".to_owned())
        })?;

    let request = serde_json::json!({
        "method": method.rpc_name(),
        "params": params,
    });
    let request_js = request
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
    let promise_js = request_fn
        .call1(&provider, &request_js)
        .map_err(|e| PortError::Transport(format!("provider request dispatch failed: {e:?}")))?;
    let promise = promise_js
        .dyn_into::<js_sys::Promise>()
        .map_err(|_| PortError::Transport("provider request did not return Promise".to_owned()))?;
    let result_js = wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| js_rpc_error(&e).into_port_error(method))?;
    serde_wasm_bindgen::from_value(result_js)
        .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
}

#[cfg(target_arch = "wasm32")]
fn js_rpc_error(value: &wasm_bindgen::JsValue) -> ProviderRpcError {
    let code = get_prop(value, "code")
        .ok()
        .and_then(|v| v.as_f64())
        .map(|n| n as i64)
        .unwrap_or(-32603);
    let message = get_prop(value, "message")
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_else(|| format!("{value:?}"));
    ProviderRpcError::new(code, message)
}

#[cfg(target_arch = "wasm32")]
fn browser_provider_available() -> bool {
    browser_provider().is_ok()
}

#[cfg(target_arch = "wasm32")]
fn browser_provider() -> Result<wasm_bindgen::JsValue, PortError> {
    let window = web_sys::window()
        .ok_or_else(|| PortError::ProviderUnavailable("missing window".to_owned()))?;
    let provider = get_prop(&window.into(), "ethereum")?;
    if provider.is_null() || provider.is_undefined() {
        return Err(PortError::WalletNotInstalled);
    }
    Ok(provider)
}

#[cfg(target_arch = "wasm32")]
fn get_prop(target: &wasm_bindgen::JsValue, key: &str) -> Result<wasm_bindgen::JsValue, PortError> {
    js_sys::Reflect::get(target, &wasm_bindgen::JsValue::from_str(key))
        .map_err(|e| PortError::Transport(format!("read provider property {key} failed: {e:?}")))
}

#[cfg(target_arch = "wasm32")]
fn js_chain_id_to_u64(value: wasm_bindgen::JsValue) -> Result<u64, PortError> {
    if let Some(s) = value.as_string() {
        return wallet_session_core::parse_chain_id_str(&s);
    }
    if let Some(num) = value.as_f64() {
        return Ok(num as u64);
    }
    Err(PortError::Validation("invalid JS chain id".to_owned()))
}
