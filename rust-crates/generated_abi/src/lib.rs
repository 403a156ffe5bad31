use std::str::FromStr;

use fuels::{
    accounts::wallet::Wallet,
    macros::abigen,
    types::{
        Bits256,
        ContractId,
    },
};

pub mod raffle_types {
    use super::*;

    abigen!(Contract(
        name = "RaffleContract",
        abi = "sway-projects/raffle/out/release/raffle-abi.json"
    ));
}

pub fn raffle_instance(id: ContractId, wallet: Wallet) -> raffle_types::RaffleContract<Wallet> {
    raffle_types::RaffleContract::new(id, wallet)
}

/// Accepts 32-byte hex ids with or without the `0x` prefix.
pub fn parse_contract_id(raw: &str) -> Option<ContractId> {
    ContractId::from_str(raw.trim()).ok()
}

pub fn winner_to_hex(winner: &Bits256) -> String {
    format!("0x{}", hex::encode(winner.0))
}
