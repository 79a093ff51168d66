use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use serde_json::Value;
use tracing::debug;

use wallet_session_core::{ChainClientPort, PortError};

use crate::WalletAdapterConfig;

/// Read-only JSON-RPC client for public chain state.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    mode: ChainClientMode,
}

#[derive(Debug, Clone)]
enum ChainClientMode {
    Http(HttpRuntime),
    InMemory(Arc<Mutex<HashMap<Address, U256>>>),
}

#[derive(Debug, Clone)]
struct HttpRuntime {
    url: String,
    client: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl RpcChainClient {
    pub fn with_config(config: &WalletAdapterConfig) -> Result<Self, PortError> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_millis(config.rpc_timeout_ms));
        let client = builder
            .build()
            .map_err(|e| PortError::Network(format!("rpc client init failed: {e}")))?;
        Ok(Self {
            mode: ChainClientMode::Http(HttpRuntime {
                url: config.rpc_url.clone(),
                client,
                next_id: Arc::new(AtomicU64::new(1)),
            }),
        })
    }

    /// Balances served from memory; unknown addresses hold zero.
    pub fn in_memory() -> Self {
        Self {
            mode: ChainClientMode::InMemory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    pub fn set_balance(&self, address: Address, wei: U256) -> Result<(), PortError> {
        match &self.mode {
            ChainClientMode::InMemory(balances) => {
                balances
                    .lock()
                    .map_err(|e| PortError::Transport(format!("balance lock poisoned: {e}")))?
                    .insert(address, wei);
                Ok(())
            }
            ChainClientMode::Http(_) => Err(PortError::Validation(
                "balances are read-only on an rpc-backed client".to_owned(),
            )),
        }
    }

    async fn rpc_call(&self, runtime: &HttpRuntime, method: &str, params: Value) -> Result<Value, PortError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": runtime.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let response = runtime
            .client
            .post(&runtime.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Network(format!("{method} request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Network(format!("{method} returned http {status}")));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Network(format!("{method} json decode failed: {e}")))?;
        if let Some(err) = body.get("error") {
            return Err(PortError::Network(format!("{method} rpc error: {err}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Network(format!("{method} response missing result")))
    }
}

impl ChainClientPort for RpcChainClient {
    async fn get_balance(&self, address: Address) -> Result<U256, PortError> {
        let runtime = match &self.mode {
            ChainClientMode::InMemory(balances) => {
                let g = balances
                    .lock()
                    .map_err(|e| PortError::Transport(format!("balance lock poisoned: {e}")))?;
                return Ok(g.get(&address).copied().unwrap_or_default());
            }
            ChainClientMode::Http(runtime) => runtime,
        };

        let result = self
            .rpc_call(
                runtime,
                "eth_getBalance",
                serde_json::json!([address.to_string(), "latest"]),
            )
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| PortError::Network("eth_getBalance must return a hex quantity".to_owned()))?;
        let balance = raw
            .parse::<U256>()
            .map_err(|e| PortError::Network(format!("invalid balance quantity {raw}: {e}")))?;
        debug!(%address, %balance, "balance fetched");
        Ok(balance)
    }
}
