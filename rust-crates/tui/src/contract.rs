use crate::session::{
    ActiveSession,
    KeystoreProvider,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use fuels::{
    accounts::wallet::Wallet,
    prelude::{
        AssetId,
        CallParameters,
        ContractId,
        Execution,
    },
};
use generated_abi::{
    parse_contract_id,
    raffle_instance,
    raffle_types::RaffleContract,
    winner_to_hex,
};
use std::pin::Pin;

/// Read-only raffle queries.
pub trait RaffleReader {
    fn entrance_fee(&self) -> impl Future<Output = Result<u64>> + Send;
    fn number_of_players(&self) -> impl Future<Output = Result<u64>> + Send;
    fn recent_winner(&self) -> impl Future<Output = Result<String>> + Send;
}

/// The one state-changing call the client makes.
pub trait RaffleWriter {
    type Pending: PendingEntry + Send;

    /// Submits `enter_raffle` paying `fee`; resolves once the node accepted the
    /// transaction.
    fn enter_raffle(&self, fee: u64) -> impl Future<Output = Result<Self::Pending>> + Send;
}

pub trait PendingEntry {
    /// Resolves after one confirmation.
    fn confirmed(self) -> impl Future<Output = Result<()>> + Send;
}

/// Binds a contract handle to whatever session the wallet currently holds.
pub trait RaffleSource {
    type Raffle: RaffleReader + RaffleWriter + Clone + Send + Sync + 'static;

    fn raffle_at(&mut self, address: &str) -> Result<Self::Raffle>;
}

type Confirmation = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

#[derive(Clone)]
pub struct FuelRaffle {
    contract_id: ContractId,
    instance: RaffleContract<Wallet>,
    base_asset_id: AssetId,
}

impl FuelRaffle {
    pub fn new(contract_id: ContractId, session: &ActiveSession) -> Self {
        Self {
            contract_id,
            instance: raffle_instance(contract_id, session.wallet.clone()),
            base_asset_id: session.base_asset_id,
        }
    }

    pub fn from_registry_entry(address: &str, session: &ActiveSession) -> Result<Self> {
        let contract_id = parse_contract_id(address).ok_or_else(|| {
            eyre!("Address registry contains an invalid contract id: {address:?}")
        })?;
        Ok(Self::new(contract_id, session))
    }

    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }
}

impl RaffleReader for FuelRaffle {
    async fn entrance_fee(&self) -> Result<u64> {
        let fee = self
            .instance
            .methods()
            .get_entrance_fee()
            .simulate(Execution::state_read_only())
            .await
            .wrap_err("get_entrance_fee failed")?
            .value;
        Ok(fee)
    }

    async fn number_of_players(&self) -> Result<u64> {
        let players = self
            .instance
            .methods()
            .get_number_of_players()
            .simulate(Execution::state_read_only())
            .await
            .wrap_err("get_number_of_players failed")?
            .value;
        Ok(players)
    }

    async fn recent_winner(&self) -> Result<String> {
        let winner = self
            .instance
            .methods()
            .get_recent_winner()
            .simulate(Execution::state_read_only())
            .await
            .wrap_err("get_recent_winner failed")?
            .value;
        Ok(winner_to_hex(&winner))
    }
}

pub struct FuelPendingEntry {
    confirmation: Confirmation,
}

impl PendingEntry for FuelPendingEntry {
    async fn confirmed(self) -> Result<()> {
        self.confirmation.await
    }
}

impl RaffleWriter for FuelRaffle {
    type Pending = FuelPendingEntry;

    async fn enter_raffle(&self, fee: u64) -> Result<FuelPendingEntry> {
        let call = CallParameters::default()
            .with_amount(fee)
            .with_asset_id(self.base_asset_id);
        let submitted = self
            .instance
            .methods()
            .enter_raffle()
            .call_params(call)?
            .submit()
            .await
            .wrap_err("enter_raffle submission failed")?;
        tracing::info!(fee, "enter_raffle submitted");
        let confirmation: Confirmation = Box::pin(async move {
            submitted
                .response()
                .await
                .wrap_err("enter_raffle was not confirmed")?;
            Ok(())
        });
        Ok(FuelPendingEntry { confirmation })
    }
}

impl RaffleSource for KeystoreProvider {
    type Raffle = FuelRaffle;

    fn raffle_at(&mut self, address: &str) -> Result<FuelRaffle> {
        let session = self
            .session()
            .ok_or_else(|| eyre!("Wallet is not enabled"))?;
        FuelRaffle::from_registry_entry(address, session)
    }
}
