use std::time::Duration;

use async_trait::async_trait;
use ptp_common::ProofArtifact;

use crate::{ArtifactVerifier, VerifierError};

pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_millis(2000);

/// Stands in for the on-chain check: waits, then accepts any well-formed
/// artifact whose verdict slot is set.
#[derive(Clone, Debug)]
pub struct SimulatedVerifier {
    delay: Duration,
}

impl SimulatedVerifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFY_DELAY)
    }
}

#[async_trait]
impl ArtifactVerifier for SimulatedVerifier {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn verify(&self, artifact: &ProofArtifact) -> Result<bool, VerifierError> {
        tokio::time::sleep(self.delay).await;
        Ok(artifact.is_supported_scheme() && artifact.inputs.attests_eligibility())
    }
}
