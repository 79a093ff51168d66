use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::{Address, Bytes, B256};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::actions;
use crate::domain::{ProviderEvent, ProviderEventKind, Session};
use crate::ports::{ChainClientPort, PortError, ProviderPort};
use crate::reconciler::{NetworkReconciler, ReconcileOutcome};
use crate::registry::NetworkRegistry;
use crate::state_machine::{session_transition, SessionAction, SessionStatus, StateTransition};

enum EventUpdate {
    Accounts(Vec<Address>),
    Chain(u64),
}

/// Owns the session and applies every transition to it, whether triggered by a
/// direct call or by a provider event.
///
/// All mutating operations take `&mut self`, so a transition is never observed
/// half-applied: derived fields are fetched first and committed together.
pub struct SessionManager<P, C>
where
    P: ProviderPort,
    C: ChainClientPort,
{
    pub provider: P,
    pub chain_client: C,
    reconciler: NetworkReconciler,
    session: Session,
    target_chain_id: Option<u64>,
    events: UnboundedReceiver<ProviderEvent>,
    last_event_sequence: u64,
}

impl<P, C> SessionManager<P, C>
where
    P: ProviderPort,
    C: ChainClientPort,
{
    pub fn new(provider: P, chain_client: C, registry: NetworkRegistry) -> Result<Self, PortError> {
        let (sink, events) = mpsc::unbounded_channel();
        if provider.is_available() {
            provider.subscribe(ProviderEventKind::AccountsChanged, sink.clone())?;
            provider.subscribe(ProviderEventKind::ChainChanged, sink)?;
        } else {
            debug!("no provider available, skipping event subscription");
        }

        Ok(Self {
            provider,
            chain_client,
            reconciler: NetworkReconciler::new(registry),
            session: Session::disconnected(),
            target_chain_id: None,
            events,
            last_event_sequence: 0,
        })
    }

    pub fn with_target_chain(mut self, chain_id: u64) -> Self {
        self.target_chain_id = Some(chain_id);
        self
    }

    pub fn session(&self) -> Session {
        self.session.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn registry(&self) -> &NetworkRegistry {
        self.reconciler.registry()
    }

    pub fn target_chain_id(&self) -> Option<u64> {
        self.target_chain_id
    }

    pub async fn connect(&mut self) -> Result<Session, PortError> {
        match self.try_connect().await {
            Ok(()) => Ok(self.session()),
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.reset_after_failed_connect();
                self.session.last_error = Some(format!("Connect wallet failed: {e}"));
                Err(e)
            }
        }
    }

    async fn try_connect(&mut self) -> Result<(), PortError> {
        if !self.provider.is_available() {
            return Err(PortError::WalletNotInstalled);
        }
        self.transition(SessionAction::BeginConnect)?;

        let accounts = self.provider.request_accounts().await?;
        let address = *accounts
            .first()
            .ok_or_else(|| PortError::ProviderUnavailable("wallet returned no accounts".to_owned()))?;
        let chain_id = self.provider.chain_id().await?;
        let balance = self.chain_client.get_balance(address).await?;

        self.transition(SessionAction::ConnectSucceeded)?;
        self.session.address = Some(address);
        self.session.chain_id = Some(chain_id);
        self.session.balance = Some(format_ether(balance));
        self.session.last_error = None;
        info!(%address, chain_id, "wallet connected");
        Ok(())
    }

    fn reset_after_failed_connect(&mut self) {
        let action = if self.session.status == SessionStatus::Connecting {
            SessionAction::ConnectFailed
        } else {
            SessionAction::Disconnect
        };
        if let Err(e) = self.transition(action) {
            debug!(error = %e, "forcing disconnected state");
            self.session.status = SessionStatus::Disconnected;
        }
        self.session.clear_account();
    }

    pub fn disconnect(&mut self) {
        if let Err(e) = self.transition(SessionAction::Disconnect) {
            debug!(error = %e, "disconnect transition rejected");
        }
        self.session = Session::disconnected();
        info!("session disconnected");
    }

    pub async fn on_accounts_changed(&mut self, accounts: Vec<Address>) -> Result<(), PortError> {
        let Some(&address) = accounts.first() else {
            if self.session.status == SessionStatus::Connected {
                self.transition(SessionAction::AccountsCleared)?;
                info!("wallet removed all accounts");
            }
            self.session.clear_account();
            return Ok(());
        };

        if self.session.status != SessionStatus::Connected {
            debug!(%address, "ignoring account change while not connected");
            return Ok(());
        }

        let balance = self.chain_client.get_balance(address).await;
        self.transition(SessionAction::AccountsChanged)?;
        self.session.address = Some(address);
        info!(%address, "active account switched");
        match balance {
            Ok(balance) => {
                self.session.balance = Some(format_ether(balance));
                Ok(())
            }
            Err(e) => {
                // A balance for the previous account must not survive the switch.
                self.session.balance = None;
                self.session.last_error = Some(format!("Refresh balance failed: {e}"));
                Err(e)
            }
        }
    }

    pub async fn on_chain_changed(&mut self, chain_id: u64) -> Result<(), PortError> {
        if self.session.status != SessionStatus::Connected {
            debug!(chain_id, "ignoring chain change while not connected");
            return Ok(());
        }
        let address = actions::require_connected(&self.session)?;

        let balance = self.chain_client.get_balance(address).await;
        self.transition(SessionAction::ChainChanged)?;
        self.session.chain_id = Some(chain_id);
        info!(chain_id, "active chain switched");
        match balance {
            Ok(balance) => {
                self.session.balance = Some(format_ether(balance));
                Ok(())
            }
            Err(e) => {
                // The old balance was read on the previous chain.
                self.session.balance = None;
                self.session.last_error = Some(format!("Refresh balance failed: {e}"));
                Err(e)
            }
        }
    }

    /// Applies every queued provider event without waiting for new ones.
    pub async fn process_pending_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.apply_event(event).await {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next provider event and applies it. Returns `None` once every
    /// provider-side sender is gone.
    pub async fn next_event(&mut self) -> Option<ProviderEvent> {
        let event = self.events.recv().await?;
        self.apply_event(event.clone()).await;
        Some(event)
    }

    async fn apply_event(&mut self, event: ProviderEvent) -> bool {
        if event.sequence != 0 && event.sequence <= self.last_event_sequence {
            debug!(sequence = event.sequence, "dropping stale provider event");
            return false;
        }

        let update = match event.kind {
            ProviderEventKind::AccountsChanged => event.parse_accounts().map(EventUpdate::Accounts),
            ProviderEventKind::ChainChanged => event.parse_chain_id().map(EventUpdate::Chain),
        };
        let update = match update {
            Ok(update) => update,
            Err(e) => {
                warn!(sequence = event.sequence, kind = ?event.kind, error = %e, "skipping malformed provider event");
                return false;
            }
        };
        self.last_event_sequence = self.last_event_sequence.max(event.sequence);

        let result = match update {
            EventUpdate::Accounts(accounts) => self.on_accounts_changed(accounts).await,
            EventUpdate::Chain(chain_id) => self.on_chain_changed(chain_id).await,
        };
        if let Err(e) = result {
            warn!(sequence = event.sequence, kind = ?event.kind, error = %e, "provider event not applied cleanly");
        }
        true
    }

    pub async fn ensure_network(&mut self, target_chain_id: u64) -> Result<ReconcileOutcome, PortError> {
        match self.try_ensure_network(target_chain_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(chain_id = target_chain_id, error = %e, "network reconciliation failed");
                self.session.last_error = Some(format!("Switch network failed: {e}"));
                Err(e)
            }
        }
    }

    async fn try_ensure_network(&mut self, target_chain_id: u64) -> Result<ReconcileOutcome, PortError> {
        if !self.provider.is_available() {
            return Err(PortError::WalletNotInstalled);
        }
        let outcome = self
            .reconciler
            .ensure_network(&self.provider, target_chain_id)
            .await?;

        if self.session.status == SessionStatus::Connected {
            match self.provider.chain_id().await {
                Ok(chain_id) if self.session.chain_id != Some(chain_id) => {
                    if let Err(e) = self.on_chain_changed(chain_id).await {
                        debug!(chain_id, error = %e, "balance refresh after reconciliation failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "could not re-read chain id after reconciliation"),
            }
        }
        Ok(outcome)
    }

    /// `amount` is a decimal amount of the native currency, e.g. `"0.01"`.
    pub async fn send_value_transfer(&mut self, to: Address, amount: &str) -> Result<B256, PortError> {
        match self.try_send_value_transfer(to, amount).await {
            Ok(hash) => {
                info!(%to, amount, tx_hash = %hash, "transfer submitted");
                Ok(hash)
            }
            Err(e) => {
                self.session.last_error = Some(format!("Send transaction failed: {e}"));
                Err(e)
            }
        }
    }

    async fn try_send_value_transfer(&mut self, to: Address, amount: &str) -> Result<B256, PortError> {
        actions::require_connected(&self.session)?;
        let value = parse_ether(amount)
            .map_err(|e| PortError::Validation(format!("invalid amount {amount:?}: {e}")))?;

        if let Some(target) = self.target_chain_id {
            if self.session.chain_id != Some(target) {
                self.try_ensure_network(target).await?;
            }
        }

        actions::send_value_transfer(&self.session, &self.provider, to, value).await
    }

    pub async fn sign_message(&mut self, message: &str) -> Result<Bytes, PortError> {
        match actions::sign_message(&self.session, &self.provider, message).await {
            Ok(signature) => Ok(signature),
            Err(e) => {
                self.session.last_error = Some(format!("Sign message failed: {e}"));
                Err(e)
            }
        }
    }

    fn transition(&mut self, action: SessionAction) -> Result<StateTransition, PortError> {
        let (to, transition) = session_transition(self.session.status, action)?;
        if transition.from != transition.to {
            debug!(from = ?transition.from, to = ?to, reason = transition.reason, "session transition");
        }
        self.session.status = to;
        Ok(transition)
    }
}
