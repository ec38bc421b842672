//! Verification through a deployed Groth16 `verifyTx` contract.

use async_trait::async_trait;
use ethers::{
    abi::{self, ParamType, Token},
    providers::{Http, Middleware, Provider},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, U256},
    utils::keccak256,
};
use ptp_common::ProofArtifact;
use tracing::{debug, warn};

use crate::{ArtifactVerifier, VerifierError};

pub const VERIFY_TX_SIGNATURE: &str = "verifyTx((uint256[2],uint256[2][2],uint256[2]),uint256[2])";

pub struct OnchainVerifier {
    provider: Provider<Http>,
    contract: Address,
}

impl OnchainVerifier {
    pub fn new(rpc_url: &str, contract: Address) -> Result<Self, VerifierError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|err| VerifierError::Config(format!("invalid rpc url '{rpc_url}': {err}")))?;
        Ok(Self { provider, contract })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }
}

/// ABI-encoded `verifyTx(proof, input)` call.
pub fn verify_tx_calldata(artifact: &ProofArtifact) -> Bytes {
    let pair = |values: [U256; 2]| Token::FixedArray(values.into_iter().map(Token::Uint).collect());

    let proof = Token::Tuple(vec![
        pair(artifact.proof.a),
        Token::FixedArray(artifact.proof.b.into_iter().map(pair).collect()),
        pair(artifact.proof.c),
    ]);
    let input = pair(artifact.inputs.as_array());

    let mut calldata = keccak256(VERIFY_TX_SIGNATURE)[..4].to_vec();
    calldata.extend_from_slice(&abi::encode(&[proof, input]));
    Bytes::from(calldata)
}

fn decode_verdict(output: &[u8]) -> Result<bool, VerifierError> {
    let tokens = abi::decode(&[ParamType::Bool], output)
        .map_err(|err| VerifierError::Verification(format!("undecodable verifyTx output: {err}")))?;
    match tokens.as_slice() {
        [Token::Bool(verdict)] => Ok(*verdict),
        other => Err(VerifierError::Verification(format!(
            "unexpected verifyTx output: {other:?}"
        ))),
    }
}

#[async_trait]
impl ArtifactVerifier for OnchainVerifier {
    fn name(&self) -> &'static str {
        "onchain"
    }

    async fn verify(&self, artifact: &ProofArtifact) -> Result<bool, VerifierError> {
        if !artifact.is_supported_scheme() {
            return Ok(false);
        }

        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.contract)
            .data(verify_tx_calldata(artifact))
            .into();
        debug!(contract = ?self.contract, "calling verifyTx");

        let output = self.provider.call(&tx, None).await.map_err(|err| {
            warn!(error = %err, contract = ?self.contract, "verifyTx call failed");
            VerifierError::Verification(err.to_string())
        })?;
        decode_verdict(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptp_common::{EthAmount, G16Proof, PublicInputs};

    fn artifact() -> ProofArtifact {
        let n = |v: u64| U256::from(v);
        ProofArtifact::new(
            G16Proof {
                a: [n(1), n(2)],
                b: [[n(3), n(4)], [n(5), n(6)]],
                c: [n(7), n(8)],
            },
            PublicInputs::bind(EthAmount::parse("0.01").unwrap(), true),
        )
    }

    #[test]
    fn calldata_is_selector_plus_ten_static_words() {
        let calldata = verify_tx_calldata(&artifact());
        assert_eq!(calldata.len(), 4 + 10 * 32);
        assert_eq!(&calldata[..4], &keccak256(VERIFY_TX_SIGNATURE)[..4]);

        let word = |i: usize| U256::from_big_endian(&calldata[4 + i * 32..4 + (i + 1) * 32]);
        let flattened: Vec<U256> = (0..10).map(word).collect();
        let expected: Vec<U256> = [1u64, 2, 3, 4, 5, 6, 7, 8]
            .into_iter()
            .map(U256::from)
            .chain([EthAmount::parse("0.01").unwrap().wei(), U256::one()])
            .collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn decodes_bool_output() {
        let yes = abi::encode(&[Token::Bool(true)]);
        let no = abi::encode(&[Token::Bool(false)]);
        assert_eq!(decode_verdict(&yes), Ok(true));
        assert_eq!(decode_verdict(&no), Ok(false));
        assert!(matches!(decode_verdict(&[]), Err(VerifierError::Verification(_))));
    }
}
