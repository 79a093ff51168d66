pub mod actions;
pub mod domain;
pub mod ports;
pub mod reconciler;
pub mod registry;
pub mod session;
pub mod state_machine;

pub use domain::{
    chain_id_hex, json_chain_id_to_u64, parse_chain_id_str, ActionKind, ActionOutcome,
    NativeCurrency, NetworkDescriptor, PendingAction, ProviderEvent, ProviderEventKind, Session,
};
pub use ports::{
    ChainClientPort, EventSink, PortError, ProviderMethod, ProviderPort, ProviderRpcError,
};
pub use reconciler::{NetworkReconciler, ReconcileOutcome};
pub use registry::{NetworkRegistry, FLOW_EVM_MAINNET, FLOW_EVM_TESTNET};
pub use session::SessionManager;
pub use state_machine::{session_transition, SessionAction, SessionStatus, StateTransition};
