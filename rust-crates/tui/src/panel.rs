//! Raffle panel: display state, the request-in-flight guard, and the workers that
//! talk to the contract on its behalf.

use crate::{
    contract::{
        PendingEntry,
        RaffleReader,
        RaffleWriter,
    },
    notifications::{
        Notification,
        NotificationSink,
    },
};
use color_eyre::eyre::Result;
use deployments::AddressRegistry;
use tokio::sync::mpsc;
use tracing::{
    error,
    info,
    warn,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleStats {
    pub entrance_fee: u64,
    pub players: u64,
    pub recent_winner: String,
}

impl Default for RaffleStats {
    fn default() -> Self {
        Self {
            entrance_fee: 0,
            players: 0,
            recent_winner: String::from("0"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Refresh,
    SubmitEntry { fee: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelEvent {
    StatsLoaded(RaffleStats),
    StatsFailed(String),
    EntrySubmitted,
    EntryConfirmed,
    EntryFailed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStage {
    Submitting,
    AwaitingConfirmation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryRejection {
    UnsupportedNetwork,
    Disconnected,
    RequestPending,
}

impl std::fmt::Display for EntryRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            EntryRejection::UnsupportedNetwork => "no raffle deployed on this chain",
            EntryRejection::Disconnected => "wallet is not connected",
            EntryRejection::RequestPending => "a request is already in flight",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Default)]
pub struct RafflePanel {
    chain_id: Option<u64>,
    address: Option<String>,
    connected: bool,
    stats: RaffleStats,
    outstanding_reads: usize,
    entry: Option<EntryStage>,
}

impl RafflePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_network(&mut self, chain_id: Option<u64>, registry: &AddressRegistry) {
        self.chain_id = chain_id;
        self.address = chain_id
            .and_then(|id| registry.resolve(id))
            .map(str::to_owned);
        match (chain_id, &self.address) {
            (Some(id), Some(address)) => info!(chain_id = id, %address, "raffle resolved"),
            (Some(id), None) => warn!(chain_id = id, "no raffle registered for chain"),
            (None, _) => {}
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_supported(&self) -> bool {
        self.address.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn stats(&self) -> &RaffleStats {
        &self.stats
    }

    pub fn entry_stage(&self) -> Option<EntryStage> {
        self.entry
    }

    pub fn is_busy(&self) -> bool {
        self.entry.is_some() || self.outstanding_reads > 0
    }

    pub fn can_enter(&self) -> bool {
        self.is_supported() && self.connected && !self.is_busy()
    }

    /// Refreshes once per disconnected-to-connected transition.
    pub fn connection_changed(&mut self, connected: bool) -> Option<Effect> {
        let was_connected = self.connected;
        self.connected = connected;
        if connected && !was_connected {
            self.request_refresh()
        } else {
            None
        }
    }

    pub fn request_refresh(&mut self) -> Option<Effect> {
        if !self.connected || !self.is_supported() {
            return None;
        }
        self.outstanding_reads += 1;
        Some(Effect::Refresh)
    }

    pub fn request_entry(&mut self) -> Result<Effect, EntryRejection> {
        if !self.is_supported() {
            return Err(EntryRejection::UnsupportedNetwork);
        }
        if !self.connected {
            return Err(EntryRejection::Disconnected);
        }
        if self.is_busy() {
            return Err(EntryRejection::RequestPending);
        }
        self.entry = Some(EntryStage::Submitting);
        Ok(Effect::SubmitEntry {
            fee: self.stats.entrance_fee,
        })
    }

    pub fn apply(
        &mut self,
        event: PanelEvent,
        notifier: &mut impl NotificationSink,
    ) -> Option<Effect> {
        match event {
            PanelEvent::StatsLoaded(stats) => {
                self.outstanding_reads = self.outstanding_reads.saturating_sub(1);
                self.stats = stats;
                None
            }
            PanelEvent::StatsFailed(reason) => {
                self.outstanding_reads = self.outstanding_reads.saturating_sub(1);
                error!(%reason, "raffle refresh failed");
                None
            }
            PanelEvent::EntrySubmitted => {
                self.entry = Some(EntryStage::AwaitingConfirmation);
                None
            }
            PanelEvent::EntryConfirmed => {
                self.entry = None;
                let refresh = self.request_refresh();
                notifier.dispatch(Notification::transaction_complete());
                refresh
            }
            PanelEvent::EntryFailed(reason) => {
                self.entry = None;
                error!(%reason, "raffle entry failed");
                None
            }
        }
    }
}

pub async fn fetch_stats<C: RaffleReader>(contract: &C) -> Result<RaffleStats> {
    let (entrance_fee, players, recent_winner) = tokio::try_join!(
        contract.entrance_fee(),
        contract.number_of_players(),
        contract.recent_winner(),
    )?;
    Ok(RaffleStats {
        entrance_fee,
        players,
        recent_winner,
    })
}

/// Runs one effect against the contract, reporting progress on `events`.
pub async fn run_effect<C>(
    contract: &C,
    effect: Effect,
    events: &mpsc::UnboundedSender<PanelEvent>,
) where
    C: RaffleReader + RaffleWriter,
{
    match effect {
        Effect::Refresh => {
            let event = match fetch_stats(contract).await {
                Ok(stats) => PanelEvent::StatsLoaded(stats),
                Err(e) => PanelEvent::StatsFailed(format!("{e:#}")),
            };
            let _ = events.send(event);
        }
        Effect::SubmitEntry { fee } => {
            let pending = match contract.enter_raffle(fee).await {
                Ok(pending) => pending,
                Err(e) => {
                    let _ = events.send(PanelEvent::EntryFailed(format!("{e:#}")));
                    return;
                }
            };
            let _ = events.send(PanelEvent::EntrySubmitted);
            let event = match pending.confirmed().await {
                Ok(()) => PanelEvent::EntryConfirmed,
                Err(e) => PanelEvent::EntryFailed(format!("{e:#}")),
            };
            let _ = events.send(event);
        }
    }
}
