//! Provider abstraction.

use async_trait::async_trait;
use ptp_common::{Address, U256};
use tokio::sync::broadcast;

use crate::error::WalletError;

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications a provider pushes to its subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// An EIP-1193 style wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask for account access. The first account is the active one.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Balance of `address` in wei.
    async fn balance_of(&self, address: Address) -> Result<U256, WalletError>;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Subscribe to account and network changes.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
