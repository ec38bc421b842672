//! ptp-orchestrator
//!
//! Ties the wallet session, pump directory, prover and verifier into the
//! claim flow: select a pump, prove the wallet balance meets its threshold,
//! verify the proof and join the pump's participants.

pub mod config;
pub mod directory;
pub mod error;
pub mod session;

pub use config::{OrchestratorConfig, DEFAULT_RPC_URL};
pub use directory::{DirectoryError, HttpPumpDirectory, PumpDirectory, DEFAULT_API_URL};
pub use error::OrchestratorError;
pub use session::{ClaimSession, SessionSnapshot, VerifyOutcome};
