//! ptp-verifier
//!
//! Checks eligibility proofs. [`ArtifactVerifier`] implementations decide
//! whether an artifact is valid; [`ProofVerifier`] tracks the verification
//! lifecycle of the current proof so that each proof resolves exactly once.

pub mod error;
pub mod onchain;
pub mod simulated;
pub mod state;

use async_trait::async_trait;
use ptp_common::ProofArtifact;

pub use error::VerifierError;
pub use onchain::{verify_tx_calldata, OnchainVerifier, VERIFY_TX_SIGNATURE};
pub use simulated::{SimulatedVerifier, DEFAULT_VERIFY_DELAY};
pub use state::{ProofVerifier, Resolution, VerificationTicket, VerifierState};

#[async_trait]
pub trait ArtifactVerifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(false)` means the proof was checked and rejected; `Err` means it
    /// could not be checked.
    async fn verify(&self, artifact: &ProofArtifact) -> Result<bool, VerifierError>;
}
