//! Wallet-mediated actions. Both executors read the active account from the
//! session and never mutate it.

use alloy::primitives::{Address, Bytes, B256, U256};
use tracing::{info, warn};

use crate::domain::{ActionKind, ActionOutcome, PendingAction, Session};
use crate::ports::{PortError, ProviderPort};

pub fn require_connected(session: &Session) -> Result<Address, PortError> {
    match session.address {
        Some(address) if session.is_connected() => Ok(address),
        _ => Err(PortError::NotConnected),
    }
}

pub async fn send_value_transfer<P: ProviderPort>(
    session: &Session,
    provider: &P,
    to: Address,
    value: U256,
) -> Result<B256, PortError> {
    let from = require_connected(session)?;
    let mut action = PendingAction::transfer(from, to, value);
    match submit(provider, &mut action).await? {
        ActionOutcome::Submitted(hash) => Ok(hash),
        other => Err(PortError::Transport(format!(
            "unexpected transfer outcome: {other:?}"
        ))),
    }
}

pub async fn sign_message<P: ProviderPort>(
    session: &Session,
    provider: &P,
    message: &str,
) -> Result<Bytes, PortError> {
    let from = require_connected(session)?;
    let mut action = PendingAction::message_sign(from, message);
    match submit(provider, &mut action).await? {
        ActionOutcome::Signed(signature) => Ok(signature),
        other => Err(PortError::Transport(format!(
            "unexpected signing outcome: {other:?}"
        ))),
    }
}

/// Hands the action to the provider once and records how it settled.
async fn submit<P: ProviderPort>(
    provider: &P,
    action: &mut PendingAction,
) -> Result<ActionOutcome, PortError> {
    let result = match &action.kind {
        ActionKind::Transfer { from, to, value } => provider
            .send_transaction(*from, *to, *value)
            .await
            .map(ActionOutcome::Submitted),
        ActionKind::MessageSign { from, message } => provider
            .sign_message(*from, message)
            .await
            .map(ActionOutcome::Signed),
    };

    match result {
        Ok(outcome) => {
            info!(signer = %action.signer(), outcome = ?outcome, "wallet action settled");
            action.outcome = Some(outcome.clone());
            Ok(outcome)
        }
        Err(e) => {
            warn!(signer = %action.signer(), error = %e, "wallet action failed");
            action.outcome = Some(ActionOutcome::Failed(e.to_string()));
            Err(e)
        }
    }
}
