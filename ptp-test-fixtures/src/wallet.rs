use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use ptp_common::{Address, EthAmount, U256};
use ptp_wallet_state::{ProviderEvent, WalletError, WalletProvider, EVENT_CHANNEL_CAPACITY};
use tokio::sync::broadcast;

/// Scriptable in-process wallet.
pub struct MockWalletProvider {
    accounts: Mutex<Vec<Address>>,
    balances: Mutex<HashMap<Address, U256>>,
    chain_id: Mutex<u64>,
    reject: AtomicBool,
    balance_queries: AtomicUsize,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWalletProvider {
    /// A wallet exposing no accounts on chain 1.
    pub fn empty() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            accounts: Mutex::new(Vec::new()),
            balances: Mutex::new(HashMap::new()),
            chain_id: Mutex::new(1),
            reject: AtomicBool::new(false),
            balance_queries: AtomicUsize::new(0),
            events,
        }
    }

    /// A wallet whose active account is `address` holding `balance`.
    pub fn with_account(address: Address, balance: EthAmount) -> Self {
        let provider = Self::empty();
        provider.set_accounts(vec![address]);
        provider.set_balance(address, balance);
        provider
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn set_balance(&self, address: Address, balance: EthAmount) {
        self.balances.lock().unwrap().insert(address, balance.wei());
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        *self.chain_id.lock().unwrap() = chain_id;
    }

    /// Make `request_accounts` fail as if the user dismissed the prompt.
    pub fn reject_requests(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Switch the active account and notify subscribers.
    pub fn switch_account(&self, address: Address, balance: EthAmount) {
        self.set_balance(address, balance);
        self.set_accounts(vec![address]);
        self.emit(ProviderEvent::AccountsChanged(vec![address]));
    }

    /// Switch network and notify subscribers.
    pub fn switch_chain(&self, chain_id: u64) {
        self.set_chain_id(chain_id);
        self.emit(ProviderEvent::ChainChanged(chain_id));
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn balance_of(&self, address: Address) -> Result<U256, WalletError> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(*self.chain_id.lock().unwrap())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
