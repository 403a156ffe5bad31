pub use generated_abi::{
    parse_contract_id,
    raffle_instance,
    raffle_types,
    winner_to_hex,
};

pub mod client;
pub mod connector;
pub mod contract;
pub mod notifications;
pub mod panel;
pub mod session;
pub mod storage;
pub mod ui;
pub mod units;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
