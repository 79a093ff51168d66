use std::collections::BTreeMap;

use crate::domain::{NativeCurrency, NetworkDescriptor};
use crate::ports::PortError;

pub const FLOW_EVM_MAINNET: u64 = 747;
pub const FLOW_EVM_TESTNET: u64 = 545;

/// Static chain id -> descriptor map consulted when registering a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    networks: BTreeMap<u64, NetworkDescriptor>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NetworkRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = NetworkDescriptor>) -> Result<Self, PortError> {
        let mut networks = BTreeMap::new();
        for descriptor in descriptors {
            if descriptor.rpc_urls.is_empty() {
                return Err(PortError::Validation(format!(
                    "network {} has no rpc urls",
                    descriptor.chain_id
                )));
            }
            let chain_id = descriptor.chain_id;
            if networks.insert(chain_id, descriptor).is_some() {
                return Err(PortError::Validation(format!(
                    "duplicate network descriptor for chain {chain_id}"
                )));
            }
        }
        Ok(Self { networks })
    }

    pub fn builtin() -> Self {
        let networks = [flow_evm_mainnet(), flow_evm_testnet()]
            .into_iter()
            .map(|d| (d.chain_id, d))
            .collect();
        Self { networks }
    }

    pub fn lookup(&self, chain_id: u64) -> Option<&NetworkDescriptor> {
        self.networks.get(&chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.networks.contains_key(&chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

fn flow_currency() -> NativeCurrency {
    NativeCurrency {
        name: "FLOW".to_owned(),
        symbol: "FLOW".to_owned(),
        decimals: 18,
    }
}

pub fn flow_evm_mainnet() -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: FLOW_EVM_MAINNET,
        display_name: "Flow EVM Mainnet".to_owned(),
        native_currency: flow_currency(),
        rpc_urls: vec!["https://mainnet.evm.nodes.onflow.org".to_owned()],
        explorer_urls: vec!["https://evm.flowscan.io/".to_owned()],
    }
}

pub fn flow_evm_testnet() -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: FLOW_EVM_TESTNET,
        display_name: "Flow EVM Testnet".to_owned(),
        native_currency: flow_currency(),
        rpc_urls: vec!["https://testnet.evm.nodes.onflow.org".to_owned()],
        explorer_urls: vec!["https://evm-testnet.flowscan.io".to_owned()],
    }
}
