use crate::{
    contract::{
        PendingEntry,
        RaffleReader,
        RaffleSource,
        RaffleWriter,
    },
    panel::RaffleStats,
    session::{
        AccountChanges,
        SessionInfo,
        WalletProvider,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    cell::Cell,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub entrance_fee: usize,
    pub number_of_players: usize,
    pub recent_winner: usize,
    pub enter_raffle: usize,
    pub confirmations: usize,
}

#[derive(Debug, Default)]
struct FakeRaffleState {
    stats: RaffleStats,
    calls: CallCounts,
    paid_fees: Vec<u64>,
    fail_reads: bool,
    fail_submissions: bool,
    fail_confirmations: bool,
}

/// In-memory raffle. A confirmed entry adds one player.
#[derive(Clone, Debug, Default)]
pub struct FakeRaffle {
    state: Arc<Mutex<FakeRaffleState>>,
}

impl FakeRaffle {
    pub fn with_stats(stats: RaffleStats) -> Self {
        let raffle = Self::default();
        raffle.lock().stats = stats;
        raffle
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeRaffleState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn paid_fees(&self) -> Vec<u64> {
        self.lock().paid_fees.clone()
    }

    pub fn fail_reads(&self) {
        self.lock().fail_reads = true;
    }

    pub fn fail_submissions(&self) {
        self.lock().fail_submissions = true;
    }

    pub fn fail_confirmations(&self) {
        self.lock().fail_confirmations = true;
    }
}

impl RaffleReader for FakeRaffle {
    async fn entrance_fee(&self) -> Result<u64> {
        let mut state = self.lock();
        state.calls.entrance_fee += 1;
        if state.fail_reads {
            return Err(eyre!("get_entrance_fee reverted"));
        }
        Ok(state.stats.entrance_fee)
    }

    async fn number_of_players(&self) -> Result<u64> {
        let mut state = self.lock();
        state.calls.number_of_players += 1;
        if state.fail_reads {
            return Err(eyre!("get_number_of_players reverted"));
        }
        Ok(state.stats.players)
    }

    async fn recent_winner(&self) -> Result<String> {
        let mut state = self.lock();
        state.calls.recent_winner += 1;
        if state.fail_reads {
            return Err(eyre!("get_recent_winner reverted"));
        }
        Ok(state.stats.recent_winner.clone())
    }
}

pub struct FakePendingEntry {
    state: Arc<Mutex<FakeRaffleState>>,
}

impl PendingEntry for FakePendingEntry {
    async fn confirmed(self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.confirmations += 1;
        if state.fail_confirmations {
            return Err(eyre!("transaction reverted"));
        }
        state.stats.players += 1;
        Ok(())
    }
}

impl RaffleWriter for FakeRaffle {
    type Pending = FakePendingEntry;

    async fn enter_raffle(&self, fee: u64) -> Result<FakePendingEntry> {
        let mut state = self.lock();
        state.calls.enter_raffle += 1;
        if state.fail_submissions {
            return Err(eyre!("user rejected the transaction"));
        }
        state.paid_fees.push(fee);
        Ok(FakePendingEntry {
            state: Arc::clone(&self.state),
        })
    }
}

/// Wallet that enables instantly against a fixed chain.
pub struct FakeProvider {
    pub chain_id: u64,
    pub account: String,
    pub fail_enable: bool,
    /// Leaves every enable request pending forever.
    pub hold_enable: bool,
    enable_calls: Cell<usize>,
    pub raffle: FakeRaffle,
    pub bound_addresses: Vec<String>,
    enabled: bool,
    account_tx: mpsc::UnboundedSender<Option<String>>,
}

impl FakeProvider {
    pub fn new(chain_id: u64, account: impl Into<String>) -> (Self, AccountChanges) {
        let (account_tx, account_rx) = mpsc::unbounded_channel();
        let provider = Self {
            chain_id,
            account: account.into(),
            fail_enable: false,
            hold_enable: false,
            enable_calls: Cell::new(0),
            raffle: FakeRaffle::default(),
            bound_addresses: Vec::new(),
            enabled: false,
            account_tx,
        };
        (provider, account_rx)
    }

    pub fn enable_calls(&self) -> usize {
        self.enable_calls.get()
    }

    /// Simulates the user switching accounts inside the wallet.
    pub fn switch_account(&mut self, account: impl Into<String>) {
        self.account = account.into();
        let _ = self.account_tx.send(Some(self.account.clone()));
    }
}

impl WalletProvider for FakeProvider {
    type Session = SessionInfo;

    fn chain_id(&self) -> Option<u64> {
        self.enabled.then_some(self.chain_id)
    }

    fn account(&self) -> Option<String> {
        self.enabled.then(|| self.account.clone())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn request_enable(&self) -> impl Future<Output = Result<SessionInfo>> + Send + 'static {
        self.enable_calls.set(self.enable_calls.get() + 1);
        let hold = self.hold_enable;
        let outcome = if self.fail_enable {
            Err(eyre!("user rejected the connection"))
        } else {
            Ok(SessionInfo {
                account: self.account.clone(),
                chain_id: self.chain_id,
            })
        };
        async move {
            if hold {
                std::future::pending::<()>().await;
            }
            outcome
        }
    }

    fn activate(&mut self, session: SessionInfo) -> SessionInfo {
        self.enabled = true;
        session
    }

    fn deactivate(&mut self) {
        self.enabled = false;
    }

    fn disconnect(&mut self) {
        let _ = self.account_tx.send(None);
    }
}

impl RaffleSource for FakeProvider {
    type Raffle = FakeRaffle;

    fn raffle_at(&mut self, address: &str) -> Result<FakeRaffle> {
        if !self.enabled {
            return Err(eyre!("wallet is not enabled"));
        }
        self.bound_addresses.push(address.to_owned());
        Ok(self.raffle.clone())
    }
}
