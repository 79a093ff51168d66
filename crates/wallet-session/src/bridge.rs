//! Bridge between the CLI shell and the session workspace crates.
//! This must remain the only shell-facing boundary for wallet operations.

use alloy::primitives::{Address, Bytes, B256};
use tracing::warn;

use wallet_session_adapters::{Eip1193Adapter, RpcChainClient, WalletAdapterConfig};
use wallet_session_core::{
    NetworkDescriptor, NetworkRegistry, PortError, ReconcileOutcome, Session, SessionManager,
    SessionStatus, FLOW_EVM_MAINNET,
};

type WalletSessionManager = SessionManager<Eip1193Adapter, RpcChainClient>;

pub struct SessionBridge {
    manager: WalletSessionManager,
    transfer_amount: String,
}

impl SessionBridge {
    pub fn from_config(config: WalletAdapterConfig) -> Result<Self, PortError> {
        let chain_client = RpcChainClient::with_config(&config)?;
        let target_chain_id = config.target_chain_id;
        let transfer_amount = config.transfer_amount.clone();
        let provider = Eip1193Adapter::with_config(config);
        Self::with_parts(provider, chain_client, target_chain_id, transfer_amount)
    }

    pub fn with_parts(
        provider: Eip1193Adapter,
        chain_client: RpcChainClient,
        target_chain_id: Option<u64>,
        transfer_amount: impl Into<String>,
    ) -> Result<Self, PortError> {
        let mut manager = SessionManager::new(provider, chain_client, NetworkRegistry::builtin())?;
        if let Some(chain_id) = target_chain_id {
            manager = manager.with_target_chain(chain_id);
        }
        Ok(Self {
            manager,
            transfer_amount: transfer_amount.into(),
        })
    }

    pub fn session(&self) -> Session {
        self.manager.session()
    }

    pub fn provider(&self) -> &Eip1193Adapter {
        &self.manager.provider
    }

    pub fn networks(&self) -> Vec<NetworkDescriptor> {
        self.manager.registry().iter().cloned().collect()
    }

    pub fn transfer_amount(&self) -> &str {
        &self.transfer_amount
    }

    pub fn target_chain_id(&self) -> Option<u64> {
        self.manager.target_chain_id()
    }

    /// Chain a bare `switch` reconciles to: the configured target, else Flow EVM mainnet.
    pub fn default_switch_target(&self) -> u64 {
        self.manager.target_chain_id().unwrap_or(FLOW_EVM_MAINNET)
    }

    pub async fn connect(&mut self) -> Result<Session, PortError> {
        self.manager.connect().await
    }

    pub async fn ensure_connected(&mut self) -> Result<Session, PortError> {
        if self.manager.status() == SessionStatus::Connected {
            return Ok(self.manager.session());
        }
        self.connect().await
    }

    pub async fn send(&mut self, to: Address, amount: Option<&str>) -> Result<B256, PortError> {
        self.ensure_connected().await?;
        let amount = amount.map(str::to_owned).unwrap_or_else(|| self.transfer_amount.clone());
        self.manager.send_value_transfer(to, &amount).await
    }

    pub async fn sign(&mut self, message: &str) -> Result<Bytes, PortError> {
        self.ensure_connected().await?;
        self.manager.sign_message(message).await
    }

    pub async fn switch_network(&mut self, chain_id: Option<u64>) -> Result<ReconcileOutcome, PortError> {
        let target = chain_id.unwrap_or_else(|| self.default_switch_target());
        self.manager.ensure_network(target).await
    }

    /// Picks up wallet-side account and chain changes, then applies every queued event.
    pub async fn drain_events(&mut self) -> usize {
        if let Err(e) = self.manager.provider.poll_wallet_state().await {
            warn!(error = %e, "wallet state poll failed");
        }
        self.manager.process_pending_events().await
    }

    /// The failure text recorded on the session, falling back to the error itself.
    pub fn failure_message(&self, error: &PortError) -> String {
        self.manager
            .session()
            .last_error
            .unwrap_or_else(|| error.to_string())
    }
}

pub fn describe_session(session: &Session) -> String {
    match (session.status, session.address) {
        (SessionStatus::Connected, Some(address)) => {
            let chain = session
                .chain_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_owned());
            let balance = session.balance.as_deref().unwrap_or("unavailable");
            format!("connected {address} on chain {chain} (balance {balance})")
        }
        (status, _) => {
            let mut line = format!("{status:?}").to_lowercase();
            if let Some(err) = &session.last_error {
                line.push_str(&format!(" ({err})"));
            }
            line
        }
    }
}

pub fn describe_network(network: &NetworkDescriptor) -> String {
    format!(
        "{:>6}  {} [{}] rpc={} explorer={}",
        network.chain_id,
        network.display_name,
        network.native_currency.symbol,
        network.rpc_urls.join(","),
        network.explorer_urls.join(","),
    )
}

pub fn describe_target(target_chain_id: Option<u64>) -> String {
    target_chain_id.map_or_else(|| "none".to_owned(), |chain_id| chain_id.to_string())
}
