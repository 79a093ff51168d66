use tracing::warn;

pub const DEFAULT_RPC_URL: &str = "https://mainnet.evm.nodes.onflow.org";
pub const DEFAULT_TRANSFER_AMOUNT: &str = "0.01";

#[derive(Debug, Clone)]
pub struct WalletAdapterConfig {
    /// JSON-RPC endpoint of a wallet bridge that forwards EIP-1193 requests.
    pub eip1193_proxy_url: Option<String>,
    /// Public RPC endpoint used for read-only balance lookups.
    pub rpc_url: String,
    pub rpc_timeout_ms: u64,
    pub target_chain_id: Option<u64>,
    pub transfer_amount: String,
}

impl Default for WalletAdapterConfig {
    fn default() -> Self {
        Self {
            eip1193_proxy_url: None,
            rpc_url: DEFAULT_RPC_URL.to_owned(),
            rpc_timeout_ms: 15_000,
            target_chain_id: None,
            transfer_amount: DEFAULT_TRANSFER_AMOUNT.to_owned(),
        }
    }
}

impl WalletAdapterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(url) = lookup("WALLET_SESSION_EIP1193_PROXY_URL").filter(|s| !s.trim().is_empty()) {
            cfg.eip1193_proxy_url = Some(url);
        }
        if let Some(url) = lookup("WALLET_SESSION_RPC_URL").filter(|s| !s.trim().is_empty()) {
            cfg.rpc_url = url;
        }
        if let Some(raw) = lookup("WALLET_SESSION_RPC_TIMEOUT_MS") {
            match raw.trim().parse() {
                Ok(ms) => cfg.rpc_timeout_ms = ms,
                Err(e) => warn!(value = %raw, error = %e, "invalid WALLET_SESSION_RPC_TIMEOUT_MS"),
            }
        }
        if let Some(raw) = lookup("WALLET_SESSION_TARGET_CHAIN_ID") {
            match wallet_session_core::parse_chain_id_str(&raw) {
                Ok(chain_id) => cfg.target_chain_id = Some(chain_id),
                Err(e) => warn!(value = %raw, error = %e, "invalid WALLET_SESSION_TARGET_CHAIN_ID"),
            }
        }
        if let Some(amount) = lookup("WALLET_SESSION_TRANSFER_AMOUNT").filter(|s| !s.trim().is_empty()) {
            cfg.transfer_amount = amount;
        }

        cfg
    }
}
