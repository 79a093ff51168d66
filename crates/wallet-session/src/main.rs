//! wallet-session: connect a browser-style wallet, move FLOW and keep it on Flow EVM.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use eyre::Result;

use wallet_session::bridge::{describe_network, describe_session, describe_target};
use wallet_session::SessionBridge;
use wallet_session_adapters::WalletAdapterConfig;
use wallet_session_core::parse_chain_id_str;

/// Drive a wallet session against an EIP-1193 provider from the command line.
#[derive(Parser)]
#[command(name = "wallet-session", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// JSON-RPC endpoint of a wallet bridge forwarding EIP-1193 requests.
    #[arg(long, global = true, env = "WALLET_SESSION_EIP1193_PROXY_URL")]
    proxy_url: Option<String>,

    /// Public RPC endpoint used for balance lookups.
    #[arg(long, global = true, env = "WALLET_SESSION_RPC_URL")]
    rpc_url: Option<String>,

    /// Chain the wallet is moved to before transfers, decimal or 0x-hex.
    #[arg(long, global = true, env = "WALLET_SESSION_TARGET_CHAIN_ID", value_parser = chain_id_arg)]
    target_chain: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Connects and prints the session snapshot.
    Status,

    /// Requests account access from the wallet.
    Connect,

    /// Sends native currency to an address.
    Send {
        /// The recipient address.
        to: Address,

        /// Decimal amount of the native currency, e.g. 0.01.
        #[arg(long)]
        amount: Option<String>,
    },

    /// Signs a UTF-8 message with personal_sign.
    Sign {
        /// The message to sign.
        message: String,
    },

    /// Moves the wallet to a known network, registering it if needed.
    Switch {
        /// Target chain id. Defaults to the configured target, else Flow EVM mainnet.
        #[arg(value_parser = chain_id_arg)]
        chain_id: Option<u64>,
    },

    /// Lists the networks the session can reconcile to.
    Networks,
}

fn chain_id_arg(raw: &str) -> Result<u64, String> {
    parse_chain_id_str(raw).map_err(|e| e.to_string())
}

impl Cli {
    fn config(&self) -> WalletAdapterConfig {
        let mut config = WalletAdapterConfig::from_env();
        if let Some(url) = &self.proxy_url {
            config.eip1193_proxy_url = Some(url.clone());
        }
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if self.target_chain.is_some() {
            config.target_chain_id = self.target_chain;
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut bridge = SessionBridge::from_config(cli.config())?;
    let result = run(&mut bridge, cli.cmd).await;

    let drained = bridge.drain_events().await;
    if drained > 0 {
        tracing::debug!(drained, "applied pending provider events");
    }
    result
}

async fn run(bridge: &mut SessionBridge, cmd: Command) -> Result<()> {
    match cmd {
        Command::Networks => {
            for network in bridge.networks() {
                println!("{}", describe_network(&network));
            }
        }
        Command::Connect => {
            if let Err(e) = bridge.connect().await {
                eyre::bail!(bridge.failure_message(&e));
            }
            println!("{}", describe_session(&bridge.session()));
        }
        Command::Status => {
            // A failed connect still leaves a printable disconnected snapshot.
            if let Err(e) = bridge.connect().await {
                tracing::warn!(error = %e, "wallet not connected");
            }
            println!("{}", describe_session(&bridge.session()));
            println!("target chain: {}", describe_target(bridge.target_chain_id()));
            println!("transfer amount: {}", bridge.transfer_amount());
        }
        Command::Send { to, amount } => match bridge.send(to, amount.as_deref()).await {
            Ok(hash) => println!("{hash}"),
            Err(e) => eyre::bail!(bridge.failure_message(&e)),
        },
        Command::Sign { message } => match bridge.sign(&message).await {
            Ok(signature) => println!("{signature}"),
            Err(e) => eyre::bail!(bridge.failure_message(&e)),
        },
        Command::Switch { chain_id } => {
            // Connect first so the session reflects the new chain.
            if let Err(e) = bridge.ensure_connected().await {
                tracing::warn!(error = %e, "switching without a connected session");
            }
            match bridge.switch_network(chain_id).await {
                Ok(outcome) => {
                    println!("{outcome:?}");
                    println!("{}", describe_session(&bridge.session()));
                }
                Err(e) => eyre::bail!(bridge.failure_message(&e)),
            }
        }
    }
    Ok(())
}
