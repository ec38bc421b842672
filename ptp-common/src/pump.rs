//! Pump records.
//!
//! A pump is a named eligibility event: a creator sets an ETH threshold and
//! wallets that prove a balance at or above it are listed as participants.

use chrono::{DateTime, Utc};
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{amount::EthAmount, error::PumpError};

/// A pump as stored and served by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pump {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator: Address,
    /// Minimum balance a participant must prove.
    pub required_eth: EthAmount,
    /// Unique, in order of successful verification.
    #[serde(default)]
    pub participants: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

impl Pump {
    /// Materialize a validated definition with a fresh id and timestamp.
    pub fn create(new: NewPump) -> Self {
        Self::with_identity(new, Uuid::new_v4(), Utc::now())
    }

    pub fn with_identity(new: NewPump, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            creator: new.creator,
            required_eth: new.required_eth,
            participants: Vec::new(),
            created_at,
        }
    }

    pub fn threshold(&self) -> EthAmount {
        self.required_eth
    }

    pub fn has_participant(&self, address: &Address) -> bool {
        self.participants.contains(address)
    }

    /// Add `address` unless already present. Returns whether the list changed.
    pub fn add_participant(&mut self, address: Address) -> bool {
        if self.has_participant(&address) {
            return false;
        }
        self.participants.push(address);
        true
    }
}

/// Validated input for pump creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPump {
    pub name: String,
    pub description: Option<String>,
    pub creator: Address,
    pub required_eth: EthAmount,
}

impl NewPump {
    /// Validate raw fields. The name is trimmed, a blank description is
    /// dropped, and the amount must be strictly positive.
    pub fn new(
        name: &str,
        description: Option<&str>,
        creator: Address,
        required_eth: EthAmount,
    ) -> Result<Self, PumpError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PumpError::validation("name must not be empty"));
        }
        if required_eth.is_zero() {
            return Err(PumpError::validation("requiredEth must be a positive number"));
        }

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            name: name.to_string(),
            description,
            creator,
            required_eth,
        })
    }
}

/// Parse a `0x`-prefixed 20-byte hex address. Case is ignored.
pub fn parse_address(input: &str) -> Result<Address, PumpError> {
    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| PumpError::validation(format!("address '{trimmed}' must start with 0x")))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PumpError::validation(format!(
            "address '{trimmed}' must be 20 bytes of hex"
        )));
    }

    hex_part
        .to_ascii_lowercase()
        .parse::<Address>()
        .map_err(|err| PumpError::validation(format!("invalid address '{trimmed}': {err}")))
}
