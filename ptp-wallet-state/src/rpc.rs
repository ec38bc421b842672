//! JSON-RPC backed wallet provider.
//!
//! A node has no push channel for account or network switches, so changes
//! are detected by polling `eth_accounts` and `eth_chainId`.

use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ptp_common::{Address, U256};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    error::WalletError,
    provider::{ProviderEvent, WalletProvider, EVENT_CHANNEL_CAPACITY},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4000);

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

pub struct JsonRpcWalletProvider {
    provider: Provider<Http>,
    events: broadcast::Sender<ProviderEvent>,
}

impl JsonRpcWalletProvider {
    pub fn new(rpc_url: &str) -> Result<Self, WalletError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|err| WalletError::Provider(format!("invalid rpc url '{rpc_url}': {err}")))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self { provider, events })
    }

    /// Poll the node every `interval` and emit an event whenever the account
    /// list or chain id differs from the previous poll. The first poll only
    /// records a baseline.
    pub fn spawn_change_poller(&self, interval: Duration) -> JoinHandle<()> {
        let provider = self.provider.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_chain: Option<u64> = None;

            loop {
                ticker.tick().await;

                match provider.get_accounts().await {
                    Ok(accounts) => {
                        if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                            debug!(count = accounts.len(), "accounts changed");
                            let _ = events.send(ProviderEvent::AccountsChanged(accounts.clone()));
                        }
                        last_accounts = Some(accounts);
                    }
                    Err(err) => warn!(error = %err, "failed to poll eth_accounts"),
                }

                match provider.get_chainid().await {
                    Ok(chain_id) => {
                        let chain_id = chain_id.low_u64();
                        if last_chain.is_some_and(|prev| prev != chain_id) {
                            debug!(chain_id, "chain changed");
                            let _ = events.send(ProviderEvent::ChainChanged(chain_id));
                        }
                        last_chain = Some(chain_id);
                    }
                    Err(err) => warn!(error = %err, "failed to poll eth_chainId"),
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        match self
            .provider
            .request::<_, Vec<Address>>("eth_requestAccounts", ())
            .await
        {
            Ok(accounts) => Ok(accounts),
            Err(err) => match map_provider_error(err) {
                WalletError::UserRejected => Err(WalletError::UserRejected),
                other => {
                    debug!(error = %other, "eth_requestAccounts failed, falling back to eth_accounts");
                    self.provider
                        .get_accounts()
                        .await
                        .map_err(map_provider_error)
                }
            },
        }
    }

    async fn balance_of(&self, address: Address) -> Result<U256, WalletError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(map_provider_error)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.provider
            .get_chainid()
            .await
            .map(|id| id.low_u64())
            .map_err(map_provider_error)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn map_provider_error(err: ProviderError) -> WalletError {
    match err.as_error_response() {
        Some(response) if response.code == USER_REJECTED_CODE => WalletError::UserRejected,
        _ => WalletError::Provider(err.to_string()),
    }
}
