//! Backend configuration, read from the environment.

use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use thiserror::Error;

const PORT_ENV: &str = "PORT";
const BIND_ADDR_ENV: &str = "PTP_BIND_ADDR";
const STORE_ENV: &str = "PTP_STORE";
const PUMP_DB_ENV: &str = "PTP_PUMP_DB";

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_PUMP_DB_PATH: &str = "data/pumps.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where pumps are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Sled { path: PathBuf },
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub store: StoreConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            store: StoreConfig::Sled {
                path: PathBuf::from(DEFAULT_PUMP_DB_PATH),
            },
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup(PORT_ENV) {
            Some(value) => value.trim().parse::<u16>().map_err(|err| ConfigError::Invalid {
                var: PORT_ENV,
                value: value.clone(),
                reason: err.to_string(),
            })?,
            None => defaults.port,
        };

        let bind_addr = match lookup(BIND_ADDR_ENV) {
            Some(value) => value.trim().parse::<IpAddr>().map_err(|err| ConfigError::Invalid {
                var: BIND_ADDR_ENV,
                value: value.clone(),
                reason: err.to_string(),
            })?,
            None => defaults.bind_addr,
        };

        let store = match lookup(STORE_ENV).map(|v| v.trim().to_ascii_lowercase()) {
            None => sled_store(&lookup),
            Some(kind) if kind == "sled" => sled_store(&lookup),
            Some(kind) if kind == "memory" => StoreConfig::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: STORE_ENV,
                    value: other,
                    reason: "expected 'sled' or 'memory'".into(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            port,
            store,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn sled_store(lookup: &impl Fn(&str) -> Option<String>) -> StoreConfig {
    let path = lookup(PUMP_DB_ENV)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PUMP_DB_PATH.to_string());
    StoreConfig::Sled {
        path: PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_browser_client() {
        let config = BackendConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.store,
            StoreConfig::Sled {
                path: PathBuf::from(DEFAULT_PUMP_DB_PATH)
            }
        );
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5001");
    }

    #[test]
    fn reads_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("PTP_BIND_ADDR", "127.0.0.1"),
            ("PTP_STORE", "Memory"),
        ]))
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(BackendConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(BackendConfig::from_lookup(lookup(&[("PTP_STORE", "mongo")])).is_err());
    }
}
