use tracing::{debug, info};

use crate::ports::{PortError, ProviderPort};
use crate::registry::NetworkRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Switched,
    Registered,
}

/// Switch-then-register protocol for bringing the provider onto a target chain.
#[derive(Debug, Clone, Default)]
pub struct NetworkReconciler {
    registry: NetworkRegistry,
}

impl NetworkReconciler {
    pub fn new(registry: NetworkRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Only `ChainUnrecognized` from the switch falls back to `add_chain`; every
    /// other switch failure is returned as-is.
    pub async fn ensure_network<P: ProviderPort>(
        &self,
        provider: &P,
        target_chain_id: u64,
    ) -> Result<ReconcileOutcome, PortError> {
        let descriptor = self
            .registry
            .lookup(target_chain_id)
            .ok_or(PortError::UnknownTargetNetwork(target_chain_id))?;

        match provider.switch_chain(target_chain_id).await {
            Ok(()) => {
                debug!(chain_id = target_chain_id, "provider switched chain");
                Ok(ReconcileOutcome::Switched)
            }
            Err(PortError::ChainUnrecognized(_)) => {
                info!(
                    chain_id = target_chain_id,
                    name = %descriptor.display_name,
                    "chain unknown to wallet, registering"
                );
                provider.add_chain(descriptor).await?;
                Ok(ReconcileOutcome::Registered)
            }
            Err(e) => Err(e),
        }
    }
}
