use ptp_common::PumpError;
use ptp_prover::{GeneratorError, ProverError};
use ptp_verifier::VerifierError;
use ptp_wallet_state::WalletError;
use thiserror::Error;

use crate::directory::DirectoryError;

/// Everything the claim flow can refuse or fail with. Validation and
/// precondition variants leave all state as it was.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Pump(#[from] PumpError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("claim session state lock poisoned")]
    Poisoned,
}
