use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::PortError;
use crate::state_machine::SessionStatus;

/// Snapshot of the wallet session as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub status: SessionStatus,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    /// Native balance formatted as a decimal string in whole currency units.
    pub balance: Option<String>,
    pub last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::disconnected()
    }
}

impl Session {
    pub fn disconnected() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            address: None,
            chain_id: None,
            balance: None,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected && self.address.is_some()
    }

    /// Drops account data but keeps the last error for display.
    pub(crate) fn clear_account(&mut self) {
        self.address = None;
        self.chain_id = None;
        self.balance = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: u64,
    pub display_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub explorer_urls: Vec<String>,
}

impl NetworkDescriptor {
    /// Parameter object for `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> Value {
        serde_json::json!({
            "chainId": chain_id_hex(self.chain_id),
            "chainName": self.display_name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.explorer_urls,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

impl ProviderEventKind {
    pub fn event_name(self) -> &'static str {
        match self {
            ProviderEventKind::AccountsChanged => "accountsChanged",
            ProviderEventKind::ChainChanged => "chainChanged",
        }
    }
}

/// Event pushed by a provider. `value` carries the raw payload: a JSON array of
/// addresses for `AccountsChanged`, a hex chain id for `ChainChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub sequence: u64,
    pub kind: ProviderEventKind,
    pub value: String,
}

impl ProviderEvent {
    pub fn accounts_changed(sequence: u64, accounts: &[Address]) -> Self {
        let value = serde_json::to_string(
            &accounts.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_owned());
        Self {
            sequence,
            kind: ProviderEventKind::AccountsChanged,
            value,
        }
    }

    pub fn chain_changed(sequence: u64, chain_id: u64) -> Self {
        Self {
            sequence,
            kind: ProviderEventKind::ChainChanged,
            value: chain_id_hex(chain_id),
        }
    }

    /// Invalid entries are dropped; a payload that is not an array is an error.
    pub fn parse_accounts(&self) -> Result<Vec<Address>, PortError> {
        let raw: Vec<String> = serde_json::from_str(&self.value)
            .map_err(|e| PortError::Validation(format!("accountsChanged payload: {e}")))?;
        Ok(raw.iter().filter_map(|s| s.parse::<Address>().ok()).collect())
    }

    pub fn parse_chain_id(&self) -> Result<u64, PortError> {
        parse_chain_id_str(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    MessageSign {
        from: Address,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Submitted(B256),
    Signed(Bytes),
    Failed(String),
}

/// An in-flight signing request. Lives for a single action call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub outcome: Option<ActionOutcome>,
}

impl PendingAction {
    pub fn transfer(from: Address, to: Address, value: U256) -> Self {
        Self {
            kind: ActionKind::Transfer { from, to, value },
            outcome: None,
        }
    }

    pub fn message_sign(from: Address, message: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::MessageSign {
                from,
                message: message.into(),
            },
            outcome: None,
        }
    }

    pub fn signer(&self) -> Address {
        match &self.kind {
            ActionKind::Transfer { from, .. } | ActionKind::MessageSign { from, .. } => *from,
        }
    }
}

pub fn chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

pub fn parse_chain_id_str(raw: &str) -> Result<u64, PortError> {
    let raw = raw.trim().trim_matches('"');
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| PortError::Validation(format!("invalid hex chain id: {e}")))
    } else {
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid chain id: {e}")))
    }
}

pub fn json_chain_id_to_u64(value: &Value) -> Result<u64, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| PortError::Validation("chain id must be string or number".to_owned()))?;
    parse_chain_id_str(s)
}
