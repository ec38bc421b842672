//! Test doubles shared by the proof-the-pump integration tests.

use ptp_common::{parse_address, Address, EthAmount};

mod directory;
mod rpc;
mod wallet;

pub use directory::InMemoryPumpDirectory;
pub use rpc::{RpcState, RpcStub};
pub use wallet::MockWalletProvider;

pub const CREATOR: &str = "0x1111111111111111111111111111111111111111";
pub const PARTICIPANT: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
pub const SECOND_PARTICIPANT: &str = "0x2222222222222222222222222222222222222222";

/// Parse one of the fixture addresses.
pub fn address(raw: &str) -> Address {
    parse_address(raw).expect("fixture address must be valid")
}

/// Parse a decimal ETH amount such as `"0.05"`.
pub fn eth(raw: &str) -> EthAmount {
    EthAmount::parse(raw).expect("fixture amount must be valid")
}
