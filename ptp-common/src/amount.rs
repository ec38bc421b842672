//! Exact ETH amounts.
//!
//! Amounts are held in wei so that threshold comparisons never go through
//! floating point. The decimal form ("0.01") is only used at the edges: JSON
//! bodies, CLI arguments and display.

use std::{cmp::Ordering, fmt, str::FromStr};

use ethers_core::{
    types::U256,
    utils::{format_ether, parse_ether},
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PumpError;

/// Number of decimal places between wei and ether.
pub const ETH_DECIMALS: usize = 18;

/// A non-negative ETH amount with wei precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EthAmount(U256);

impl EthAmount {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn from_wei(wei: impl Into<U256>) -> Self {
        Self(wei.into())
    }

    pub fn wei(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a decimal ether string such as `"0.01"` or `"2"`.
    ///
    /// Rejects empty input, signs, exponents and more than 18 fractional
    /// digits.
    pub fn parse(input: &str) -> Result<Self, PumpError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PumpError::Validation("amount must not be empty".into()));
        }

        let (whole, frac) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (trimmed, ""),
        };
        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
            return Err(PumpError::Validation(format!(
                "'{trimmed}' is not a decimal ETH amount"
            )));
        }
        if frac.len() > ETH_DECIMALS {
            return Err(PumpError::Validation(format!(
                "'{trimmed}' has more than {ETH_DECIMALS} decimal places"
            )));
        }

        let normalized = match (whole.is_empty(), frac.is_empty()) {
            (true, _) => format!("0.{frac}"),
            (false, true) => whole.to_string(),
            (false, false) => format!("{whole}.{frac}"),
        };
        parse_ether(&normalized)
            .map(Self)
            .map_err(|err| PumpError::Validation(format!("invalid ETH amount '{trimmed}': {err}")))
    }

    /// Parse from a JSON value as sent by browser clients: either a number
    /// (`0.01`) or a string (`"0.01"`).
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PumpError> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::parse(&u.to_string())
                } else if let Some(f) = n.as_f64() {
                    if f.is_sign_negative() {
                        return Err(PumpError::Validation(format!(
                            "amount must be positive, got {n}"
                        )));
                    }
                    Self::parse(&f.to_string())
                } else {
                    Err(PumpError::Validation(format!("amount must be positive, got {n}")))
                }
            }
            other => Err(PumpError::Validation(format!(
                "amount must be a number or decimal string, got {other}"
            ))),
        }
    }
}

impl fmt::Display for EthAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = format_ether(self.0);
        let display = match full.split_once('.') {
            Some((whole, frac)) => {
                let frac = frac.trim_end_matches('0');
                if frac.is_empty() {
                    whole.to_string()
                } else {
                    format!("{whole}.{frac}")
                }
            }
            None => full,
        };
        f.write_str(&display)
    }
}

impl FromStr for EthAmount {
    type Err = PumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialOrd for EthAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EthAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Serialize for EthAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EthAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = EthAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal ETH amount as string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                EthAmount::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                EthAmount::parse(&v.to_string()).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v < 0 {
                    return Err(E::custom(format!("amount must not be negative, got {v}")));
                }
                EthAmount::parse(&v.to_string()).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                if v.is_sign_negative() || !v.is_finite() {
                    return Err(E::custom(format!("amount must be a finite positive number, got {v}")));
                }
                EthAmount::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}
