use alloy::primitives::{Address, Bytes, B256, U256};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::{NetworkDescriptor, ProviderEvent, ProviderEventKind};

pub const USER_REJECTED_CODE: i64 = 4001;
pub const UNAUTHORIZED_CODE: i64 = 4100;
pub const DISCONNECTED_CODE: i64 = 4900;
pub const CHAIN_DISCONNECTED_CODE: i64 = 4901;
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("wallet not installed")]
    WalletNotInstalled,
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("user rejected the request: {0}")]
    UserRejected(String),
    #[error("chain {0} is not recognized by the wallet")]
    ChainUnrecognized(u64),
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),
    #[error("adding network failed: {0}")]
    AddFailed(String),
    #[error("unknown target network: {0}")]
    UnknownTargetNetwork(u64),
    #[error("network error: {0}")]
    Network(String),
    #[error("wallet not connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Provider request kinds, used to classify provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMethod {
    RequestAccounts,
    Accounts,
    ChainId,
    SendTransaction,
    PersonalSign,
    SwitchChain(u64),
    AddChain(u64),
}

impl ProviderMethod {
    pub fn rpc_name(self) -> &'static str {
        match self {
            ProviderMethod::RequestAccounts => "eth_requestAccounts",
            ProviderMethod::Accounts => "eth_accounts",
            ProviderMethod::ChainId => "eth_chainId",
            ProviderMethod::SendTransaction => "eth_sendTransaction",
            ProviderMethod::PersonalSign => "personal_sign",
            ProviderMethod::SwitchChain(_) => "wallet_switchEthereumChain",
            ProviderMethod::AddChain(_) => "wallet_addEthereumChain",
        }
    }
}

/// EIP-1193 `ProviderRpcError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
    }

    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN_CODE,
            format!("Unrecognized chain ID \"{chain_id:#x}\"."),
        )
    }

    pub fn into_port_error(self, method: ProviderMethod) -> PortError {
        match (self.code, method) {
            (USER_REJECTED_CODE, _) => PortError::UserRejected(self.message),
            (UNAUTHORIZED_CODE | DISCONNECTED_CODE | CHAIN_DISCONNECTED_CODE, _) => {
                PortError::ProviderUnavailable(self.message)
            }
            (UNRECOGNIZED_CHAIN_CODE, ProviderMethod::SwitchChain(chain_id)) => {
                PortError::ChainUnrecognized(chain_id)
            }
            (code, ProviderMethod::SendTransaction) => {
                PortError::SubmissionFailed(format!("code {code}: {}", self.message))
            }
            (code, ProviderMethod::AddChain(_)) => {
                PortError::AddFailed(format!("code {code}: {}", self.message))
            }
            (code, method) => PortError::Transport(format!(
                "{} failed with code {code}: {}",
                method.rpc_name(),
                self.message
            )),
        }
    }
}

pub type EventSink = UnboundedSender<ProviderEvent>;

#[allow(async_fn_in_trait)]
pub trait ProviderPort {
    /// Capability probe: whether an injected provider is reachable at all.
    fn is_available(&self) -> bool;
    async fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
    async fn chain_id(&self) -> Result<u64, PortError>;
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<B256, PortError>;
    async fn sign_message(&self, from: Address, message: &str) -> Result<Bytes, PortError>;
    async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError>;
    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<(), PortError>;
    fn subscribe(&self, kind: ProviderEventKind, sink: EventSink) -> Result<(), PortError>;
}

#[allow(async_fn_in_trait)]
pub trait ChainClientPort {
    /// Native balance in the smallest unit (wei).
    async fn get_balance(&self, address: Address) -> Result<U256, PortError>;
}
