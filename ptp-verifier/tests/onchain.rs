use ethers::utils::keccak256;
use ptp_common::{G16Proof, ProofArtifact, PublicInputs, U256};
use ptp_test_fixtures::{address, eth, RpcState, RpcStub, CREATOR};
use ptp_verifier::{verify_tx_calldata, ArtifactVerifier, OnchainVerifier, VerifierError, VERIFY_TX_SIGNATURE};

fn artifact(eligible: bool) -> ProofArtifact {
    let n = |v: u64| U256::from(v);
    ProofArtifact::new(
        G16Proof {
            a: [n(11), n(12)],
            b: [[n(21), n(22)], [n(23), n(24)]],
            c: [n(31), n(32)],
        },
        PublicInputs::bind(eth("0.01"), eligible),
    )
}

#[tokio::test]
async fn calls_verify_tx_on_the_contract() {
    let node = RpcStub::spawn(RpcState::default()).await;
    let contract = address(CREATOR);
    let verifier = OnchainVerifier::new(node.url(), contract).unwrap();

    assert_eq!(verifier.verify(&artifact(true)).await, Ok(true));

    let state = node.state();
    assert_eq!(state.last_call_to, Some(contract));
    let data = state.last_call_data.expect("eth_call carried calldata");
    assert_eq!(&data[..4], &keccak256(VERIFY_TX_SIGNATURE)[..4]);
    assert_eq!(data, verify_tx_calldata(&artifact(true)));
}

#[tokio::test]
async fn contract_rejection_is_false() {
    let mut state = RpcState::default();
    state.call_verdict = false;
    let node = RpcStub::spawn(state).await;
    let verifier = OnchainVerifier::new(node.url(), address(CREATOR)).unwrap();

    assert_eq!(verifier.verify(&artifact(true)).await, Ok(false));
}

#[tokio::test]
async fn revert_is_a_verification_error() {
    let mut state = RpcState::default();
    state.revert_calls = true;
    let node = RpcStub::spawn(state).await;
    let verifier = OnchainVerifier::new(node.url(), address(CREATOR)).unwrap();

    assert!(matches!(
        verifier.verify(&artifact(true)).await,
        Err(VerifierError::Verification(_))
    ));
}

#[tokio::test]
async fn foreign_scheme_never_reaches_the_node() {
    let node = RpcStub::spawn(RpcState::default()).await;
    let verifier = OnchainVerifier::new(node.url(), address(CREATOR)).unwrap();

    let mut foreign = artifact(true);
    foreign.curve = "bls12_381".into();
    assert_eq!(verifier.verify(&foreign).await, Ok(false));
    assert_eq!(node.calls("eth_call"), 0);
}

#[test]
fn invalid_rpc_url_is_config_error() {
    assert!(matches!(
        OnchainVerifier::new("not a url", address(CREATOR)),
        Err(VerifierError::Config(_))
    ));
}
