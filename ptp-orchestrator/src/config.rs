//! Orchestrator configuration.

use std::{env, time::Duration};

use anyhow::{Context, Result};
use ptp_common::{parse_address, Address};
use ptp_prover::DEFAULT_PROOF_DELAY;
use ptp_verifier::DEFAULT_VERIFY_DELAY;
use ptp_wallet_state::DEFAULT_POLL_INTERVAL;

use crate::directory::DEFAULT_API_URL;

const API_URL_ENV: &str = "PTP_API_URL";
const RPC_URL_ENV: &str = "PTP_RPC_URL";
const VERIFIER_ADDRESS_ENV: &str = "PTP_VERIFIER_ADDRESS";
const PROOF_DELAY_ENV: &str = "PTP_PROOF_DELAY_MS";
const VERIFY_DELAY_ENV: &str = "PTP_VERIFY_DELAY_MS";
const POLL_INTERVAL_ENV: &str = "PTP_POLL_INTERVAL_MS";

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Pump API root.
    pub api_url: String,
    /// JSON-RPC node for the wallet provider and the on-chain verifier.
    pub rpc_url: String,
    /// Deployed `verifyTx` contract; unset selects the simulated verifier.
    pub verifier_address: Option<Address>,
    pub proof_delay: Duration,
    pub verify_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            verifier_address: None,
            proof_delay: DEFAULT_PROOF_DELAY,
            verify_delay: DEFAULT_VERIFY_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let non_empty = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let verifier_address = non_empty(VERIFIER_ADDRESS_ENV)
            .map(|raw| parse_address(&raw))
            .transpose()
            .with_context(|| format!("{VERIFIER_ADDRESS_ENV} must be a 0x-prefixed address"))?;

        let millis = |var: &'static str, default: Duration| -> Result<Duration> {
            match non_empty(var) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{var} must be a number of milliseconds")),
                None => Ok(default),
            }
        };

        Ok(Self {
            api_url: non_empty(API_URL_ENV).unwrap_or(defaults.api_url),
            rpc_url: non_empty(RPC_URL_ENV).unwrap_or(defaults.rpc_url),
            verifier_address,
            proof_delay: millis(PROOF_DELAY_ENV, defaults.proof_delay)?,
            verify_delay: millis(VERIFY_DELAY_ENV, defaults.verify_delay)?,
            poll_interval: millis(POLL_INTERVAL_ENV, defaults.poll_interval)?,
        })
    }
}
