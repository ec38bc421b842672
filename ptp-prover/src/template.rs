//! Template-backed prover.

use std::time::Duration;

use async_trait::async_trait;
use ptp_common::{Address, EthAmount, G16Proof, ProofArtifact, PublicInputs};
use tracing::debug;
use uuid::Uuid;

use crate::error::ProverError;

/// ZoKrates `proof.json` used as the proof body for every artifact.
pub const PROOF_TEMPLATE_JSON: &str = include_str!("../fixtures/proof_template.json");

pub const DEFAULT_PROOF_DELAY: Duration = Duration::from_millis(1500);

/// Inputs to one proof. `balance` is the private witness of `claimant`,
/// `threshold` is public.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofRequest {
    pub pump_id: Uuid,
    pub claimant: Address,
    pub balance: EthAmount,
    pub threshold: EthAmount,
}

impl ProofRequest {
    pub fn eligible(&self) -> bool {
        self.balance >= self.threshold
    }
}

#[async_trait]
pub trait EligibilityProver: Send + Sync {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofArtifact, ProverError>;
}

/// Copies a fixed proof after a delay and binds the public inputs to the
/// request: `[threshold_wei, eligible as 0/1]`.
#[derive(Clone, Debug)]
pub struct TemplateProver {
    proof: G16Proof,
    delay: Duration,
}

impl TemplateProver {
    /// Use the embedded template.
    pub fn new(delay: Duration) -> Result<Self, ProverError> {
        Self::from_template_json(PROOF_TEMPLATE_JSON, delay)
    }

    pub fn from_template_json(json: &str, delay: Duration) -> Result<Self, ProverError> {
        let template: ProofArtifact = serde_json::from_str(json)?;
        if !template.is_supported_scheme() {
            return Err(ProverError::UnsupportedScheme {
                scheme: template.scheme,
                curve: template.curve,
            });
        }
        Ok(Self {
            proof: template.proof,
            delay,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl EligibilityProver for TemplateProver {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofArtifact, ProverError> {
        tokio::time::sleep(self.delay).await;

        let eligible = request.eligible();
        debug!(pump_id = %request.pump_id, threshold = %request.threshold, eligible, "proof produced");
        Ok(ProofArtifact::new(
            self.proof.clone(),
            PublicInputs::bind(request.threshold, eligible),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ptp_common::U256;

    fn request(balance: &str, threshold: &str) -> ProofRequest {
        ProofRequest {
            pump_id: Uuid::new_v4(),
            claimant: Address::repeat_byte(0x11),
            balance: EthAmount::parse(balance).unwrap(),
            threshold: EthAmount::parse(threshold).unwrap(),
        }
    }

    #[test]
    fn eligibility_examples() {
        assert!(request("0.02", "0.01").eligible());
        assert!(request("0.01", "0.01").eligible());
        assert!(!request("0.005", "0.01").eligible());
    }

    #[test]
    fn embedded_template_parses() {
        let prover = TemplateProver::new(Duration::ZERO).unwrap();
        assert_eq!(prover.delay(), Duration::ZERO);
    }

    #[test]
    fn rejects_foreign_scheme() {
        let json = PROOF_TEMPLATE_JSON.replace("\"g16\"", "\"gm17\"");
        assert!(matches!(
            TemplateProver::from_template_json(&json, Duration::ZERO),
            Err(ProverError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            TemplateProver::from_template_json("{}", Duration::ZERO),
            Err(ProverError::InvalidTemplate(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn prove_waits_then_binds_inputs() {
        let prover = TemplateProver::new(DEFAULT_PROOF_DELAY).unwrap();
        let req = request("0.05", "0.01");

        let started = tokio::time::Instant::now();
        let artifact = prover.prove(&req).await.unwrap();
        assert!(started.elapsed() >= DEFAULT_PROOF_DELAY);

        assert!(artifact.is_supported_scheme());
        assert!(artifact.attests(req.threshold));

        let rejected = prover.prove(&request("0.005", "0.01")).await.unwrap();
        assert!(!rejected.inputs.attests_eligibility());
        assert_eq!(rejected.proof, artifact.proof);
    }

    proptest! {
        #[test]
        fn eligible_iff_balance_meets_threshold(balance in any::<u128>(), threshold in any::<u128>()) {
            let req = ProofRequest {
                pump_id: Uuid::nil(),
                claimant: Address::zero(),
                balance: EthAmount::from_wei(U256::from(balance)),
                threshold: EthAmount::from_wei(U256::from(threshold)),
            };
            prop_assert_eq!(req.eligible(), balance >= threshold);

            let inputs = PublicInputs::bind(req.threshold, req.eligible());
            prop_assert_eq!(inputs.attests_eligibility(), balance >= threshold);
            prop_assert_eq!(inputs.threshold(), req.threshold);
        }
    }
}
