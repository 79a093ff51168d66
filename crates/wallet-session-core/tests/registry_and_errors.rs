use wallet_session_core::{
    parse_chain_id_str, registry, NetworkRegistry, PortError, ProviderEvent, ProviderMethod,
    ProviderRpcError, FLOW_EVM_MAINNET, FLOW_EVM_TESTNET,
};

#[test]
fn builtin_registry_knows_flow_networks() {
    let registry = NetworkRegistry::builtin();
    assert_eq!(registry.len(), 2);
    let mainnet = registry.lookup(FLOW_EVM_MAINNET).expect("mainnet");
    assert_eq!(mainnet.display_name, "Flow EVM Mainnet");
    assert_eq!(mainnet.native_currency.symbol, "FLOW");
    assert_eq!(mainnet.native_currency.decimals, 18);
    assert!(registry.contains(FLOW_EVM_TESTNET));
    assert!(registry.lookup(1).is_none());
}

#[test]
fn registry_rejects_duplicates_and_missing_rpc_urls() {
    let err = NetworkRegistry::new([registry::flow_evm_mainnet(), registry::flow_evm_mainnet()])
        .expect_err("duplicate");
    assert!(err.to_string().contains("duplicate"));

    let mut no_rpc = registry::flow_evm_testnet();
    no_rpc.rpc_urls.clear();
    let err = NetworkRegistry::new([no_rpc]).expect_err("empty rpc urls");
    assert!(matches!(err, PortError::Validation(_)));
}

#[test]
fn add_chain_params_use_wallet_field_names() {
    let params = registry::flow_evm_testnet().add_chain_params();
    assert_eq!(params["chainId"], "0x221");
    assert_eq!(params["chainName"], "Flow EVM Testnet");
    assert_eq!(params["nativeCurrency"]["decimals"], 18);
    assert_eq!(params["rpcUrls"][0], "https://testnet.evm.nodes.onflow.org");
    assert_eq!(
        params["blockExplorerUrls"][0],
        "https://evm-testnet.flowscan.io"
    );
}

#[test]
fn provider_codes_map_to_error_kinds() {
    let rejected = ProviderRpcError::user_rejected().into_port_error(ProviderMethod::SwitchChain(545));
    assert!(matches!(rejected, PortError::UserRejected(_)));

    let unknown = ProviderRpcError::unrecognized_chain(545).into_port_error(ProviderMethod::SwitchChain(545));
    assert_eq!(unknown, PortError::ChainUnrecognized(545));

    let submit = ProviderRpcError::new(-32000, "insufficient funds")
        .into_port_error(ProviderMethod::SendTransaction);
    assert!(matches!(submit, PortError::SubmissionFailed(_)));

    let add = ProviderRpcError::new(-32602, "invalid rpc url")
        .into_port_error(ProviderMethod::AddChain(545));
    assert!(matches!(add, PortError::AddFailed(_)));

    let gone = ProviderRpcError::new(4900, "disconnected").into_port_error(ProviderMethod::ChainId);
    assert!(matches!(gone, PortError::ProviderUnavailable(_)));

    let other = ProviderRpcError::new(4902, "odd").into_port_error(ProviderMethod::PersonalSign);
    assert!(matches!(other, PortError::Transport(_)));
}

#[test]
fn chain_ids_parse_from_hex_and_decimal() {
    assert_eq!(parse_chain_id_str("0x2eb").expect("hex"), 747);
    assert_eq!(parse_chain_id_str("0X221").expect("upper hex"), 545);
    assert_eq!(parse_chain_id_str("545").expect("decimal"), 545);
    assert!(parse_chain_id_str("flow").is_err());

    let event = ProviderEvent::chain_changed(3, 747);
    assert_eq!(event.value, "0x2eb");
    assert_eq!(event.parse_chain_id().expect("round trip"), 747);
}

#[test]
fn accounts_payload_skips_invalid_entries() {
    let event = ProviderEvent {
        sequence: 1,
        kind: wallet_session_core::ProviderEventKind::AccountsChanged,
        value: r#"["0x1000000000000000000000000000000000000001","junk"]"#.to_owned(),
    };
    let accounts = event.parse_accounts().expect("accounts");
    assert_eq!(accounts.len(), 1);

    let bad = ProviderEvent {
        value: "{}".to_owned(),
        ..event
    };
    assert!(bad.parse_accounts().is_err());
}
