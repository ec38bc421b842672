use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("invalid proof template: {0}")]
    InvalidTemplate(#[from] serde_json::Error),

    #[error("unsupported proof system {scheme}/{curve}")]
    UnsupportedScheme { scheme: String, curve: String },

    #[error("proof generation failed: {0}")]
    Generation(String),
}

/// Reasons a generation request is refused before any work starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("no pump selected")]
    NoPumpSelected,

    #[error("proof already generated for this pump")]
    AlreadyGenerated,

    #[error("proof generation already in progress")]
    InFlight,
}
