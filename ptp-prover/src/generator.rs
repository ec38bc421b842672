//! Proof generation state machine.
//!
//! ```text
//!           begin              complete
//!   Idle ──────────▶ Generating ──────────▶ Generated
//!    ▲                   │ abort                │
//!    └───────────────────┘                      │
//!    ▲          select a different pump         │
//!    └──────────────────────────────────────────┘
//! ```
//!
//! Generation runs outside the state machine: `begin` hands out a
//! [`GenerationTicket`] and the caller reports back with `complete`. A
//! ticket issued before the latest selection change (or account change, see
//! [`ProofGenerator::invalidate`]) is stale and its result is dropped.

use chrono::{DateTime, Utc};
use ptp_common::{Address, EligibilityClaim, EthAmount, ProofArtifact};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{GeneratorError, ProverError},
    template::ProofRequest,
};

/// Result of a finished generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub pump_id: Uuid,
    pub claimant: Address,
    pub eligible: bool,
    pub artifact: ProofArtifact,
    pub generated_at: DateTime<Utc>,
}

impl GenerationOutcome {
    /// The verification hand-off; only eligible outcomes produce one.
    pub fn claim(&self) -> Option<EligibilityClaim> {
        self.eligible.then(|| EligibilityClaim {
            pump_id: self.pump_id,
            claimant: self.claimant,
            artifact: self.artifact.clone(),
            generated_at: self.generated_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneratorState {
    Idle,
    Generating { request: ProofRequest, ticket: GenerationTicket },
    Generated(GenerationOutcome),
}

/// Identifies one `begin` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationTicket {
    pub pump_id: Uuid,
    epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Selection {
    pump_id: Uuid,
    threshold: EthAmount,
}

#[derive(Debug)]
pub struct ProofGenerator {
    selection: Option<Selection>,
    epoch: u64,
    state: GeneratorState,
}

impl Default for ProofGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofGenerator {
    pub fn new() -> Self {
        Self {
            selection: None,
            epoch: 0,
            state: GeneratorState::Idle,
        }
    }

    pub fn state(&self) -> &GeneratorState {
        &self.state
    }

    pub fn selected_pump(&self) -> Option<Uuid> {
        self.selection.map(|s| s.pump_id)
    }

    pub fn outcome(&self) -> Option<&GenerationOutcome> {
        match &self.state {
            GeneratorState::Generated(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.state, GeneratorState::Generating { .. })
    }

    /// Select the pump proofs are generated for. Changing the pump or its
    /// threshold resets to `Idle` and invalidates outstanding tickets;
    /// re-selecting the same pump keeps the current state.
    pub fn select_pump(&mut self, pump_id: Uuid, threshold: EthAmount) {
        let next = Selection { pump_id, threshold };
        if self.selection == Some(next) {
            return;
        }
        self.selection = Some(next);
        self.reset();
        debug!(%pump_id, %threshold, epoch = self.epoch, "generator selection changed");
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.reset();
        }
    }

    /// Drop any proof for the current selection, keeping the selection.
    /// Used when the wallet account changes under a generated proof.
    pub fn invalidate(&mut self) {
        if self.state != GeneratorState::Idle {
            debug!(epoch = self.epoch, "generator invalidated");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.state = GeneratorState::Idle;
    }

    /// Check preconditions and move to `Generating`. `account` and
    /// `balance` describe the connected wallet; both are required.
    pub fn begin(
        &mut self,
        account: Option<Address>,
        balance: Option<EthAmount>,
    ) -> Result<(ProofRequest, GenerationTicket), GeneratorError> {
        let (claimant, balance) = account.zip(balance).ok_or(GeneratorError::WalletNotConnected)?;
        let selection = self.selection.ok_or(GeneratorError::NoPumpSelected)?;
        match self.state {
            GeneratorState::Idle => {}
            GeneratorState::Generating { .. } => return Err(GeneratorError::InFlight),
            GeneratorState::Generated(_) => return Err(GeneratorError::AlreadyGenerated),
        }

        let request = ProofRequest {
            pump_id: selection.pump_id,
            claimant,
            balance,
            threshold: selection.threshold,
        };
        let ticket = GenerationTicket {
            pump_id: selection.pump_id,
            epoch: self.epoch,
        };
        self.state = GeneratorState::Generating { request, ticket };
        Ok((request, ticket))
    }

    fn is_current(&self, ticket: &GenerationTicket) -> bool {
        matches!(&self.state, GeneratorState::Generating { ticket: current, .. } if current == ticket)
    }

    /// Record the artifact for `ticket`. Returns `Ok(None)` when the ticket
    /// is stale.
    ///
    /// The artifact's public inputs must carry the requested threshold and
    /// the verdict the request implies; otherwise generation is aborted and
    /// nothing is handed to verification.
    pub fn complete(
        &mut self,
        ticket: GenerationTicket,
        artifact: ProofArtifact,
    ) -> Result<Option<GenerationOutcome>, ProverError> {
        if !self.is_current(&ticket) {
            debug!(pump_id = %ticket.pump_id, "dropping stale proof");
            return Ok(None);
        }
        let GeneratorState::Generating { request, .. } = self.state else {
            return Ok(None);
        };

        let eligible = request.eligible();
        if artifact.inputs.threshold() != request.threshold || artifact.inputs.attests_eligibility() != eligible {
            self.state = GeneratorState::Idle;
            return Err(ProverError::Generation(format!(
                "artifact inputs (threshold {}, verdict {}) do not match the request (threshold {}, verdict {})",
                artifact.inputs.threshold(),
                artifact.inputs.attests_eligibility(),
                request.threshold,
                eligible
            )));
        }

        let outcome = GenerationOutcome {
            pump_id: request.pump_id,
            claimant: request.claimant,
            eligible,
            artifact,
            generated_at: Utc::now(),
        };
        self.state = GeneratorState::Generated(outcome.clone());
        Ok(Some(outcome))
    }

    /// Return to `Idle` after a failed generation. Stale tickets are ignored.
    pub fn abort(&mut self, ticket: GenerationTicket) {
        if self.is_current(&ticket) {
            self.state = GeneratorState::Idle;
        }
    }
}
