use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("no wallet provider available")]
    ProviderUnavailable,

    #[error("user rejected the account access request")]
    UserRejected,

    #[error("provider returned no accounts")]
    NoAccounts,

    #[error("wallet not connected")]
    NotConnected,

    /// Transport or node failure, surfaced as-is.
    #[error("provider error: {0}")]
    Provider(String),
}
