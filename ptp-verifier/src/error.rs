use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("no proof to verify; generate one first")]
    NoProof,

    #[error("proof already verified or rejected; generate a new proof")]
    AlreadyResolved,

    #[error("verification already in progress")]
    InFlight,

    #[error("proof public inputs do not match the selected pump")]
    InputMismatch,

    #[error("proof was generated for a different wallet account")]
    ClaimantMismatch,

    #[error("invalid verifier configuration: {0}")]
    Config(String),

    /// The verifier could not be reached or answered garbage.
    #[error("verification failed: {0}")]
    Verification(String),
}
