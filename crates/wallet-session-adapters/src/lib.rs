pub mod chain_client;
pub mod config;
pub mod eip1193;

pub use chain_client::RpcChainClient;
pub use config::WalletAdapterConfig;
pub use eip1193::Eip1193Adapter;
