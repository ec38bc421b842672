//! ptp-common
//!
//! Types shared by every proof-the-pump crate: exact ETH amounts, pump
//! records, the eligibility proof artifact and the validation error
//! taxonomy.

pub mod amount;
pub mod error;
pub mod proof;
pub mod pump;

pub use amount::{EthAmount, ETH_DECIMALS};
pub use error::PumpError;
pub use ethers_core::types::{Address, U256};
pub use proof::{
    EligibilityClaim, G16Proof, ProofArtifact, PublicInputs, PROOF_CURVE, PROOF_SCHEME, PUBLIC_INPUT_COUNT,
};
pub use pump::{parse_address, NewPump, Pump};

/// Shorten an address for display, e.g. `0x1234...abcd`.
pub fn short_address(address: &Address) -> String {
    let full = format!("{address:?}");
    if full.len() <= 10 {
        return full;
    }
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
