//! Wallet Session State
//!
//! Tracks the connected account and its balance on top of an EIP-1193 style
//! provider. The provider is abstract ([`WalletProvider`]) so the session can
//! run against a JSON-RPC node ([`JsonRpcWalletProvider`]) or a test double.
//!
//! # State Model
//!
//! ```text
//! WalletSnapshot = {
//!     address:  Option<Address>    - None while disconnected
//!     balance:  Option<EthAmount>  - refreshed on connect and on change events
//!     chain_id: Option<u64>        - last network reported by the provider
//! }
//! ```
//!
//! # Events
//!
//! - `AccountsChanged([])` disconnects (address and balance cleared)
//! - `AccountsChanged([a, ..])` adopts `a` and refreshes its balance
//! - `ChainChanged(id)` refreshes the balance, connection state unchanged

pub mod error;
pub mod provider;
pub mod rpc;
pub mod session;

pub use error::WalletError;
pub use provider::{ProviderEvent, WalletProvider, EVENT_CHANNEL_CAPACITY};
pub use rpc::{JsonRpcWalletProvider, DEFAULT_POLL_INTERVAL};
pub use session::{WalletSession, WalletSnapshot, WatchHandle};
