use alloy::primitives::{Address, U256};

use wallet_session::bridge::{describe_network, describe_session, describe_target};
use wallet_session::SessionBridge;
use wallet_session_adapters::{Eip1193Adapter, RpcChainClient};
use wallet_session_core::{
    PortError, ProviderRpcError, ReconcileOutcome, SessionStatus, FLOW_EVM_MAINNET,
    FLOW_EVM_TESTNET,
};

fn owner() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("owner address")
}

fn bridge(target: Option<u64>) -> SessionBridge {
    let chain = RpcChainClient::in_memory();
    chain
        .set_balance(owner(), U256::from(1_000_000_000_000_000_000u64))
        .expect("seed balance");
    SessionBridge::with_parts(Eip1193Adapter::deterministic(), chain, target, "0.01")
        .expect("bridge")
}

#[tokio::test]
async fn send_connects_on_demand_and_uses_default_amount() {
    let mut bridge = bridge(Some(FLOW_EVM_MAINNET));

    bridge
        .send(Address::repeat_byte(0xbe), None)
        .await
        .expect("send");

    let session = bridge.session();
    assert_eq!(session.status, SessionStatus::Connected);
    assert_eq!(session.chain_id, Some(FLOW_EVM_MAINNET));
    assert_eq!(bridge.transfer_amount(), "0.01");
    assert_eq!(
        describe_session(&session),
        format!("connected {} on chain 747 (balance 1.000000000000000000)", owner())
    );
}

#[tokio::test]
async fn rejected_sign_reports_session_error() {
    let mut bridge = bridge(None);
    bridge
        .provider()
        .debug_reject("personal_sign", ProviderRpcError::user_rejected())
        .expect("script rejection");

    let err = bridge.sign("hello").await.expect_err("rejected");

    assert!(matches!(err, PortError::UserRejected(_)));
    assert!(bridge
        .failure_message(&err)
        .starts_with("Sign message failed:"));
    assert!(bridge.session().is_connected());
}

#[tokio::test]
async fn bare_switch_targets_flow_mainnet() {
    let mut bridge = bridge(None);
    assert_eq!(bridge.default_switch_target(), FLOW_EVM_MAINNET);
    bridge.connect().await.expect("connect");

    let outcome = bridge.switch_network(None).await.expect("switch");
    assert_eq!(outcome, ReconcileOutcome::Registered);

    let outcome = bridge
        .switch_network(Some(FLOW_EVM_TESTNET))
        .await
        .expect("testnet");
    assert_eq!(outcome, ReconcileOutcome::Registered);
    assert_eq!(bridge.session().chain_id, Some(FLOW_EVM_TESTNET));

    bridge.drain_events().await;
    assert_eq!(bridge.session().chain_id, Some(FLOW_EVM_TESTNET));
}

#[tokio::test]
async fn locked_wallet_event_disconnects() {
    let mut bridge = bridge(None);
    bridge.connect().await.expect("connect");

    bridge
        .provider()
        .debug_inject_accounts_changed(vec![])
        .expect("lock");
    assert_eq!(bridge.drain_events().await, 1);

    let session = bridge.session();
    assert_eq!(session.status, SessionStatus::Disconnected);
    assert_eq!(describe_session(&session), "disconnected");
}

#[test]
fn networks_lists_builtin_flow_chains() {
    let bridge = bridge(None);
    let networks = bridge.networks();

    let ids: Vec<u64> = networks.iter().map(|n| n.chain_id).collect();
    assert_eq!(ids, vec![FLOW_EVM_TESTNET, FLOW_EVM_MAINNET]);
    assert!(describe_network(&networks[1]).contains("Flow EVM Mainnet [FLOW]"));
}

#[test]
fn status_reports_unset_target_as_none() {
    let untargeted = bridge(None);
    assert_eq!(untargeted.target_chain_id(), None);
    assert_eq!(describe_target(untargeted.target_chain_id()), "none");
    assert_eq!(untargeted.default_switch_target(), FLOW_EVM_MAINNET);

    let targeted = bridge(Some(FLOW_EVM_TESTNET));
    assert_eq!(describe_target(targeted.target_chain_id()), "545");
}
