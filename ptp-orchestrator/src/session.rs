//! The claim flow.
//!
//! ```text
//! WalletSession ──▶ select pump ──▶ ProofGenerator ──▶ ProofVerifier ──▶ PumpDirectory
//!                   (directory)     (balance, threshold)  (artifact)      .add_participant
//! ```
//!
//! [`ClaimSession`] owns the collaborators and the per-selection state. Flow
//! state sits behind a synchronous mutex that is never held across an
//! `.await`; long-running work (proving, verifying, HTTP) runs unlocked and
//! reports back through tickets, so a result that arrives after the
//! selection changed is dropped.
//!
//! A proof belongs to the account that generated it. Whenever the flow sees
//! a different wallet account than the one it last worked with, the
//! generated proof and any verification are discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use ptp_common::{Address, EthAmount, NewPump, Pump, PumpError};
use ptp_prover::{EligibilityProver, GenerationOutcome, ProofGenerator};
use ptp_verifier::{ArtifactVerifier, ProofVerifier, Resolution, VerifierState};
use ptp_wallet_state::{WalletError, WalletSession, WalletSnapshot};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{directory::PumpDirectory, error::OrchestratorError};

/// How a `verify_proof` call ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Proof accepted; the pump as stored after adding the participant.
    Registered(Pump),
    Rejected,
    /// The selection changed while verifying.
    Stale,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub wallet: WalletSnapshot,
    pub pumps: Vec<Pump>,
    pub selected_pump: Option<Uuid>,
    pub generating: bool,
    pub outcome: Option<GenerationOutcome>,
    pub verification: VerifierState,
}

impl SessionSnapshot {
    pub fn selected(&self) -> Option<&Pump> {
        let id = self.selected_pump?;
        self.pumps.iter().find(|p| p.id == id)
    }
}

#[derive(Default)]
struct FlowState {
    pumps: Vec<Pump>,
    selected: Option<Uuid>,
    /// Wallet account the generator and verifier state belongs to.
    account: Option<Address>,
    generator: ProofGenerator,
    verifier: ProofVerifier,
}

pub struct ClaimSession {
    wallet: Arc<AsyncMutex<WalletSession>>,
    directory: Arc<dyn PumpDirectory>,
    prover: Arc<dyn EligibilityProver>,
    verifier: Arc<dyn ArtifactVerifier>,
    flow: Mutex<FlowState>,
}

impl ClaimSession {
    pub fn new(
        wallet: Arc<AsyncMutex<WalletSession>>,
        directory: Arc<dyn PumpDirectory>,
        prover: Arc<dyn EligibilityProver>,
        verifier: Arc<dyn ArtifactVerifier>,
    ) -> Self {
        Self {
            wallet,
            directory,
            prover,
            verifier,
            flow: Mutex::new(FlowState::default()),
        }
    }

    pub fn wallet(&self) -> Arc<AsyncMutex<WalletSession>> {
        Arc::clone(&self.wallet)
    }

    fn flow(&self) -> Result<MutexGuard<'_, FlowState>, OrchestratorError> {
        self.flow.lock().map_err(|_| OrchestratorError::Poisoned)
    }

    pub async fn connect_wallet(&self) -> Result<WalletSnapshot, OrchestratorError> {
        Ok(self.wallet.lock().await.connect().await?)
    }

    /// Reload pumps from the directory. The selection is kept; if the
    /// selected pump disappeared it is cleared.
    pub async fn refresh_pumps(&self) -> Result<Vec<Pump>, OrchestratorError> {
        let pumps = self.directory.list().await?;

        let mut flow = self.flow()?;
        if let Some(selected) = flow.selected {
            if !pumps.iter().any(|p| p.id == selected) {
                debug!(pump_id = %selected, "selected pump no longer listed");
                clear_selection(&mut flow);
            }
        }
        flow.pumps = pumps.clone();
        Ok(pumps)
    }

    /// Create a pump owned by the connected wallet, then reload the list.
    ///
    /// Input is validated locally before anything is sent.
    pub async fn create_pump(
        &self,
        name: &str,
        description: Option<&str>,
        required_eth: EthAmount,
    ) -> Result<Pump, OrchestratorError> {
        let creator = self
            .wallet
            .lock()
            .await
            .address()
            .ok_or(WalletError::NotConnected)?;
        let new = NewPump::new(name, description, creator, required_eth)?;

        let pump = self.directory.create(&new).await?;
        info!(pump_id = %pump.id, name = %pump.name, "pump created");
        self.refresh_pumps().await?;
        Ok(pump)
    }

    /// Make `pump_id` the active pump. Switching to a different pump resets
    /// proof generation and verification.
    pub fn select_pump(&self, pump_id: Uuid) -> Result<Pump, OrchestratorError> {
        let mut flow = self.flow()?;
        let pump = flow
            .pumps
            .iter()
            .find(|p| p.id == pump_id)
            .cloned()
            .ok_or(PumpError::NotFound(pump_id))?;

        if flow.selected != Some(pump_id) {
            flow.verifier.reset();
            debug!(%pump_id, "pump selected");
        }
        flow.selected = Some(pump_id);
        flow.generator.select_pump(pump_id, pump.threshold());
        Ok(pump)
    }

    pub fn clear_selection(&self) -> Result<(), OrchestratorError> {
        let mut flow = self.flow()?;
        clear_selection(&mut flow);
        Ok(())
    }

    /// Generate an eligibility proof for the selected pump with the wallet's
    /// current balance.
    ///
    /// Returns `Ok(None)` when the selection changed while proving. An
    /// eligible outcome is queued for verification.
    pub async fn generate_proof(&self) -> Result<Option<GenerationOutcome>, OrchestratorError> {
        let (account, balance) = {
            let wallet = self.wallet.lock().await;
            (wallet.address(), wallet.balance())
        };
        let (request, ticket) = {
            let mut flow = self.flow()?;
            sync_account(&mut flow, account);
            flow.generator.begin(account, balance).map_err(|err| {
                warn!(error = %err, "proof generation refused");
                err
            })?
        };

        let proved = self.prover.prove(&request).await;
        let account = self.wallet.lock().await.address();

        let mut flow = self.flow()?;
        sync_account(&mut flow, account);
        let artifact = match proved {
            Ok(artifact) => artifact,
            Err(err) => {
                flow.generator.abort(ticket);
                warn!(error = %err, "proof generation failed");
                return Err(err.into());
            }
        };

        let outcome = match flow.generator.complete(ticket, artifact) {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return Ok(None),
            Err(err) => {
                warn!(error = %err, "prover returned an unusable artifact");
                return Err(err.into());
            }
        };
        if let Some(claim) = outcome.claim() {
            flow.verifier.load(claim, request.threshold);
        }
        info!(pump_id = %outcome.pump_id, eligible = outcome.eligible, "proof generated");
        Ok(Some(outcome))
    }

    /// Verify the pending proof and, if it holds, register the account that
    /// generated it as a participant.
    ///
    /// Refused when the connected account is not the proof's claimant. An
    /// account switch while verifying makes the result stale.
    pub async fn verify_proof(&self) -> Result<VerifyOutcome, OrchestratorError> {
        let account = self.wallet.lock().await.address();
        let address = account.ok_or(WalletError::NotConnected)?;
        let (claim, ticket) = {
            let mut flow = self.flow()?;
            sync_account(&mut flow, account);
            flow.verifier.begin(address)?
        };

        info!(pump_id = %claim.pump_id, verifier = self.verifier.name(), "verifying proof");
        let checked = self.verifier.verify(&claim.artifact).await;
        let account = self.wallet.lock().await.address();

        let resolution = {
            let mut flow = self.flow()?;
            sync_account(&mut flow, account);
            match checked {
                Ok(verified) => flow.verifier.complete(ticket, verified),
                Err(err) => {
                    flow.verifier.fail(ticket, &err);
                    return Err(err.into());
                }
            }
        };

        match resolution {
            Resolution::Verified(claim) => {
                let pump = self
                    .directory
                    .add_participant(claim.pump_id, claim.claimant)
                    .await?;
                info!(pump_id = %pump.id, participants = pump.participants.len(), "participant registered");

                let mut flow = self.flow()?;
                if let Some(slot) = flow.pumps.iter_mut().find(|p| p.id == pump.id) {
                    *slot = pump.clone();
                }
                Ok(VerifyOutcome::Registered(pump))
            }
            Resolution::Rejected => Ok(VerifyOutcome::Rejected),
            Resolution::Stale => Ok(VerifyOutcome::Stale),
        }
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, OrchestratorError> {
        let wallet = self.wallet.lock().await.snapshot();
        let mut flow = self.flow()?;
        sync_account(&mut flow, wallet.address);
        Ok(SessionSnapshot {
            wallet,
            pumps: flow.pumps.clone(),
            selected_pump: flow.selected,
            generating: flow.generator.is_generating(),
            outcome: flow.generator.outcome().cloned(),
            verification: flow.verifier.state().clone(),
        })
    }
}

/// Discard proof state that belongs to another account.
fn sync_account(flow: &mut FlowState, account: Option<Address>) {
    if flow.account == account {
        return;
    }
    if flow.account.is_some() {
        debug!(account = ?account, "wallet account changed; discarding proof state");
    }
    flow.account = account;
    flow.generator.invalidate();
    flow.verifier.reset();
}

fn clear_selection(flow: &mut FlowState) {
    flow.selected = None;
    flow.generator.clear_selection();
    flow.verifier.reset();
}
