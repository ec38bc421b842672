//! Verification lifecycle of the current proof.
//!
//! `Idle -> Verifying -> Verified | Failed`. Both outcomes are terminal for
//! the loaded claim; a fresh claim (a newly generated proof) starts over at
//! `Idle`. Loading a claim or resetting invalidates outstanding tickets.

use ptp_common::{Address, EligibilityClaim, EthAmount};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::VerifierError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum VerifierState {
    #[default]
    Idle,
    Verifying,
    Verified,
    Failed { reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationTicket {
    pub pump_id: Uuid,
    epoch: u64,
}

/// What a finished verification means for the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Register the claimant for `claim.pump_id`.
    Verified(EligibilityClaim),
    Rejected,
    /// The claim was replaced while verification ran; ignore the result.
    Stale,
}

#[derive(Debug, Default)]
pub struct ProofVerifier {
    claim: Option<(EligibilityClaim, EthAmount)>,
    epoch: u64,
    state: VerifierState,
}

impl ProofVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &VerifierState {
        &self.state
    }

    pub fn claim(&self) -> Option<&EligibilityClaim> {
        self.claim.as_ref().map(|(claim, _)| claim)
    }

    /// Load a freshly generated claim, checked later against `threshold`,
    /// the selected pump's requirement.
    pub fn load(&mut self, claim: EligibilityClaim, threshold: EthAmount) {
        debug!(pump_id = %claim.pump_id, "proof loaded for verification");
        self.claim = Some((claim, threshold));
        self.epoch += 1;
        self.state = VerifierState::Idle;
    }

    /// Drop the current claim, e.g. because the pump selection changed.
    pub fn reset(&mut self) {
        self.claim = None;
        self.epoch += 1;
        self.state = VerifierState::Idle;
    }

    /// Start verifying the loaded claim on behalf of `account`.
    ///
    /// Refuses with `ClaimantMismatch`, leaving the state untouched, when
    /// `account` is not the one the proof was generated for. Fails with
    /// `InputMismatch`, moving to `Failed`, when the artifact's public inputs
    /// do not attest eligibility for the pump threshold.
    pub fn begin(&mut self, account: Address) -> Result<(EligibilityClaim, VerificationTicket), VerifierError> {
        let (claim, threshold) = self.claim.clone().ok_or(VerifierError::NoProof)?;
        match self.state {
            VerifierState::Idle => {}
            VerifierState::Verifying => return Err(VerifierError::InFlight),
            VerifierState::Verified | VerifierState::Failed { .. } => {
                return Err(VerifierError::AlreadyResolved)
            }
        }

        if claim.claimant != account {
            warn!(pump_id = %claim.pump_id, "proof belongs to another account");
            return Err(VerifierError::ClaimantMismatch);
        }

        if !claim.artifact.attests(threshold) {
            warn!(pump_id = %claim.pump_id, "proof inputs do not attest the pump threshold");
            self.state = VerifierState::Failed {
                reason: VerifierError::InputMismatch.to_string(),
            };
            return Err(VerifierError::InputMismatch);
        }

        self.state = VerifierState::Verifying;
        let ticket = VerificationTicket {
            pump_id: claim.pump_id,
            epoch: self.epoch,
        };
        Ok((claim, ticket))
    }

    fn is_current(&self, ticket: &VerificationTicket) -> bool {
        ticket.epoch == self.epoch && self.state == VerifierState::Verifying
    }

    /// Record the verifier's answer for `ticket`.
    pub fn complete(&mut self, ticket: VerificationTicket, verified: bool) -> Resolution {
        if !self.is_current(&ticket) {
            debug!(pump_id = %ticket.pump_id, "dropping stale verification result");
            return Resolution::Stale;
        }
        let Some((claim, _)) = self.claim.clone() else {
            return Resolution::Stale;
        };

        if verified {
            info!(pump_id = %claim.pump_id, "proof verified");
            self.state = VerifierState::Verified;
            Resolution::Verified(claim)
        } else {
            info!(pump_id = %claim.pump_id, "proof rejected");
            self.state = VerifierState::Failed {
                reason: "verifier rejected the proof".into(),
            };
            Resolution::Rejected
        }
    }

    /// Record that `ticket` could not be verified. No retry is attempted.
    pub fn fail(&mut self, ticket: VerificationTicket, error: &VerifierError) -> Resolution {
        if !self.is_current(&ticket) {
            return Resolution::Stale;
        }
        warn!(pump_id = %ticket.pump_id, error = %error, "verification failed");
        self.state = VerifierState::Failed {
            reason: error.to_string(),
        };
        Resolution::Rejected
    }
}
