use serde::{Deserialize, Serialize};

use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    BeginConnect,
    ConnectSucceeded,
    ConnectFailed,
    AccountsChanged,
    AccountsCleared,
    ChainChanged,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub reason: &'static str,
}

pub fn session_transition(
    from: SessionStatus,
    action: SessionAction,
) -> Result<(SessionStatus, StateTransition), PortError> {
    use SessionAction as A;
    use SessionStatus as S;

    let (to, reason) = match (from, action) {
        (S::Disconnected | S::Connecting | S::Connected, A::BeginConnect) => {
            (S::Connecting, "connect requested")
        }
        (S::Connecting, A::ConnectSucceeded) => (S::Connected, "connect succeeded"),
        (S::Connecting, A::ConnectFailed) => (S::Disconnected, "connect failed"),
        (S::Connected, A::AccountsChanged) => (S::Connected, "active account switched"),
        (S::Connected, A::ChainChanged) => (S::Connected, "active chain switched"),
        (S::Disconnected | S::Connected, A::AccountsCleared) => {
            (S::Disconnected, "all accounts removed")
        }
        (_, A::Disconnect) => (S::Disconnected, "disconnect requested"),
        (from, action) => {
            return Err(PortError::Validation(format!(
                "illegal session transition: {from:?} + {action:?}"
            )))
        }
    };

    Ok((to, StateTransition { from, to, reason }))
}
