//! Eligibility proof artifacts.
//!
//! The artifact mirrors the `proof.json` layout emitted by ZoKrates for the
//! Groth16 scheme on bn128, which is also the layout the Solidity
//! `verifyTx` contract consumes:
//!
//! ```text
//! { "scheme": "g16", "curve": "bn128",
//!   "proof": { "a": [x, y], "b": [[x0, x1], [y0, y1]], "c": [x, y] },
//!   "inputs": [threshold_wei, verdict] }
//! ```

use chrono::{DateTime, Utc};
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::EthAmount;

pub const PROOF_SCHEME: &str = "g16";
pub const PROOF_CURVE: &str = "bn128";
pub const PUBLIC_INPUT_COUNT: usize = 2;

/// Group elements of a pairing-based proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct G16Proof {
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
}

/// Public inputs exposed to the verifier.
///
/// Slot 0 is the threshold in wei that the balance was compared against,
/// slot 1 is the comparison output (1 when the balance met the threshold).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicInputs(pub [U256; PUBLIC_INPUT_COUNT]);

impl PublicInputs {
    pub fn bind(threshold: EthAmount, eligible: bool) -> Self {
        let verdict = if eligible { U256::one() } else { U256::zero() };
        Self([threshold.wei(), verdict])
    }

    pub fn threshold(&self) -> EthAmount {
        EthAmount::from_wei(self.0[0])
    }

    pub fn attests_eligibility(&self) -> bool {
        self.0[1] == U256::one()
    }

    pub fn as_array(&self) -> [U256; PUBLIC_INPUT_COUNT] {
        self.0
    }
}

/// A proof plus the public inputs it was produced for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub scheme: String,
    pub curve: String,
    pub proof: G16Proof,
    pub inputs: PublicInputs,
}

impl ProofArtifact {
    pub fn new(proof: G16Proof, inputs: PublicInputs) -> Self {
        Self {
            scheme: PROOF_SCHEME.to_string(),
            curve: PROOF_CURVE.to_string(),
            proof,
            inputs,
        }
    }

    /// Whether the artifact names the proof system this workspace speaks.
    pub fn is_supported_scheme(&self) -> bool {
        self.scheme.eq_ignore_ascii_case(PROOF_SCHEME) && self.curve.eq_ignore_ascii_case(PROOF_CURVE)
    }

    /// True when the artifact was generated for `threshold` and claims the
    /// balance met it.
    pub fn attests(&self, threshold: EthAmount) -> bool {
        self.inputs.threshold() == threshold && self.inputs.attests_eligibility()
    }
}

/// What a successful, eligible generation hands over for verification.
///
/// `claimant` is the account whose balance was proven; only that account
/// may be registered with the claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityClaim {
    pub pump_id: Uuid,
    pub claimant: Address,
    pub artifact: ProofArtifact,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> G16Proof {
        G16Proof {
            a: [U256::from(1u8), U256::from(2u8)],
            b: [
                [U256::from(3u8), U256::from(4u8)],
                [U256::from(5u8), U256::from(6u8)],
            ],
            c: [U256::from(7u8), U256::from(8u8)],
        }
    }

    #[test]
    fn inputs_bind_threshold_and_verdict() {
        let threshold = EthAmount::parse("0.01").unwrap();
        let artifact = ProofArtifact::new(sample_proof(), PublicInputs::bind(threshold, true));

        assert!(artifact.is_supported_scheme());
        assert!(artifact.attests(threshold));
        assert!(!artifact.attests(EthAmount::parse("0.02").unwrap()));

        let failed = ProofArtifact::new(sample_proof(), PublicInputs::bind(threshold, false));
        assert!(!failed.attests(threshold));
    }

    #[test]
    fn reads_zokrates_proof_json() {
        let json = serde_json::json!({
            "scheme": "g16",
            "curve": "bn128",
            "proof": {
                "a": ["0x01", "0x02"],
                "b": [["0x03", "0x04"], ["0x05", "0x06"]],
                "c": ["0x07", "0x08"]
            },
            "inputs": [
                "0x000000000000000000000000000000000000000000000000002386f26fc10000",
                "0x0000000000000000000000000000000000000000000000000000000000000001"
            ]
        });

        let artifact: ProofArtifact = serde_json::from_value(json).unwrap();
        assert_eq!(artifact.proof, sample_proof());
        assert_eq!(artifact.inputs.threshold().to_string(), "0.01");
        assert!(artifact.inputs.attests_eligibility());
    }
}
