//! ptp-prover
//!
//! Produces eligibility proofs: "my balance is at least the pump threshold".
//!
//! - [`EligibilityProver`] is the seam for the actual proving backend. The
//!   shipped [`TemplateProver`] copies a fixed Groth16 proof and only binds
//!   the public inputs; a witness-computing prover can replace it.
//! - [`ProofGenerator`] is the per-selection state machine that decides when
//!   a proof may be requested and discards results that arrive after the
//!   selection moved on.

pub mod error;
pub mod generator;
pub mod template;

pub use error::{GeneratorError, ProverError};
pub use generator::{GenerationOutcome, GenerationTicket, GeneratorState, ProofGenerator};
pub use template::{
    EligibilityProver, ProofRequest, TemplateProver, DEFAULT_PROOF_DELAY, PROOF_TEMPLATE_JSON,
};
