//! The connected-wallet session and its event subscription.

use std::sync::Arc;

use ptp_common::{short_address, Address, EthAmount};
use serde::Serialize;
use tokio::{
    sync::{broadcast::error::RecvError, watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::WalletError,
    provider::{ProviderEvent, WalletProvider},
};

/// Point-in-time view of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub address: Option<Address>,
    pub balance: Option<EthAmount>,
    pub chain_id: Option<u64>,
}

impl WalletSnapshot {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// `0x1234...abcd` form of the connected address.
    pub fn short_address(&self) -> Option<String> {
        self.address.as_ref().map(short_address)
    }
}

pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    snapshot: WalletSnapshot,
    updates: watch::Sender<WalletSnapshot>,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self::with_provider(Some(provider))
    }

    /// A session with nothing to connect to; `connect` fails with
    /// [`WalletError::ProviderUnavailable`].
    pub fn without_provider() -> Self {
        Self::with_provider(None)
    }

    fn with_provider(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let (updates, _) = watch::channel(WalletSnapshot::default());
        Self {
            provider,
            snapshot: WalletSnapshot::default(),
            updates,
        }
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        self.snapshot.clone()
    }

    pub fn address(&self) -> Option<Address> {
        self.snapshot.address
    }

    pub fn balance(&self) -> Option<EthAmount> {
        self.snapshot.balance
    }

    /// Receiver that observes every snapshot change.
    pub fn updates(&self) -> watch::Receiver<WalletSnapshot> {
        self.updates.subscribe()
    }

    fn provider(&self) -> Result<Arc<dyn WalletProvider>, WalletError> {
        self.provider.clone().ok_or(WalletError::ProviderUnavailable)
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot.clone());
    }

    /// Request account access and load the first account's balance.
    ///
    /// On error the session is left as it was.
    pub async fn connect(&mut self) -> Result<WalletSnapshot, WalletError> {
        let provider = self.provider()?;

        let accounts = provider.request_accounts().await.map_err(|err| {
            warn!(error = %err, "wallet connection refused");
            err
        })?;
        let address = *accounts.first().ok_or(WalletError::NoAccounts)?;
        let balance = EthAmount::from_wei(provider.balance_of(address).await?);
        let chain_id = provider.chain_id().await?;

        self.snapshot = WalletSnapshot {
            address: Some(address),
            balance: Some(balance),
            chain_id: Some(chain_id),
        };
        self.publish();
        info!(
            address = %short_address(&address),
            balance = %balance,
            chain_id,
            "wallet connected"
        );
        Ok(self.snapshot())
    }

    /// Query the balance of `address` in ETH. The session balance is updated
    /// only when `address` is the connected account.
    pub async fn refresh_balance(&mut self, address: Address) -> Result<EthAmount, WalletError> {
        let provider = self.provider()?;
        let balance = EthAmount::from_wei(provider.balance_of(address).await?);

        if self.snapshot.address == Some(address) {
            self.snapshot.balance = Some(balance);
            self.publish();
            debug!(address = %short_address(&address), balance = %balance, "balance refreshed");
        }
        Ok(balance)
    }

    pub fn disconnect(&mut self) {
        if self.snapshot.address.take().is_some() {
            info!("wallet disconnected");
        }
        self.snapshot.balance = None;
        self.publish();
    }

    /// Apply a provider notification.
    pub async fn handle_event(&mut self, event: ProviderEvent) -> Result<WalletSnapshot, WalletError> {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => self.disconnect(),
                Some(address) => {
                    if self.snapshot.address != Some(address) {
                        debug!(address = %short_address(&address), "active account changed");
                        self.snapshot.address = Some(address);
                        self.snapshot.balance = None;
                        self.publish();
                    }
                    self.refresh_balance(address).await?;
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                debug!(chain_id, "network changed");
                self.snapshot.chain_id = Some(chain_id);
                self.publish();
                if let Some(address) = self.snapshot.address {
                    self.refresh_balance(address).await?;
                }
            }
        }
        Ok(self.snapshot())
    }

    /// Start applying provider events to `session` in a background task.
    ///
    /// Events keep flowing until the returned handle is unsubscribed or
    /// dropped.
    pub async fn watch(session: Arc<Mutex<WalletSession>>) -> Result<WatchHandle, WalletError> {
        let (mut events, updates) = {
            let guard = session.lock().await;
            (guard.provider()?.subscribe(), guard.updates())
        };

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let mut guard = session.lock().await;
                        if let Err(err) = guard.handle_event(event).await {
                            warn!(error = %err, "failed to apply wallet event");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "wallet event stream lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("wallet event stream closed");
                        break;
                    }
                }
            }
        });

        Ok(WatchHandle { task, updates })
    }
}

/// Live subscription created by [`WalletSession::watch`]. Dropping it
/// unsubscribes.
pub struct WatchHandle {
    task: JoinHandle<()>,
    updates: watch::Receiver<WalletSnapshot>,
}

impl WatchHandle {
    pub fn updates(&self) -> watch::Receiver<WalletSnapshot> {
        self.updates.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
