#![allow(non_snake_case)]

use deployments::{
    RegistryStore,
    record_deployment,
};
use raffle_client::{
    client::{
        AppController,
        WorkerEvents,
    },
    connector::{
        ConnectorEffect,
        ConnectorView,
    },
    notifications::Notification,
    panel::RaffleStats,
    session::{
        AccountChanges,
        SessionInfo,
        WalletProvider,
    },
    storage::{
        CONNECTED_KEY,
        ClientStorage,
        FileStorage,
        STORAGE_FILE,
    },
    test_helpers::{
        FakeProvider,
        FakeRaffle,
    },
};
use std::path::Path;
use tempdir::TempDir;

const CHAIN_ID: u64 = 0;
const CONTRACT: &str = "0x3333333333333333333333333333333333333333333333333333333333333333";
const ACCOUNT: &str = "0xabcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789";

type Controller = AppController<FakeProvider, FileStorage>;

struct Harness {
    controller: Controller,
    account_changes: AccountChanges,
    events: WorkerEvents<SessionInfo>,
}

impl Harness {
    fn start(dir: &Path, chain_id: u64) -> Self {
        let registry_path = dir.join("contract_addresses.json");
        record_deployment(&registry_path, CHAIN_ID, CONTRACT).unwrap();
        let registry = RegistryStore::new(&registry_path).load().unwrap();

        let (mut provider, account_changes) = FakeProvider::new(chain_id, ACCOUNT);
        provider.raffle = FakeRaffle::with_stats(RaffleStats {
            entrance_fee: 250_000_000,
            players: 7,
            recent_winner: String::from("0xbeef"),
        });
        let storage = FileStorage::open(dir.join(STORAGE_FILE)).unwrap();
        let (controller, events) = AppController::new(provider, storage, registry);
        Self {
            controller,
            account_changes,
            events,
        }
    }

    async fn settle(&mut self) {
        while self.controller.panel().is_busy() {
            let event = self.events.panel.recv().await.unwrap();
            self.controller.on_panel_event(event);
        }
    }

    async fn enable(&mut self, effect: ConnectorEffect) {
        self.controller.run_connector_effect(effect);
        let event = self.events.connector.recv().await.unwrap();
        self.controller.on_connector_event(event);
        self.settle().await;
    }

    async fn connect(&mut self) {
        let effect = self.controller.connect().unwrap();
        self.enable(effect).await;
    }
}

#[tokio::test]
async fn connect_enter_and_lock__full_session() {
    let dir = TempDir::new("raffle_flow").unwrap();
    let mut harness = Harness::start(dir.path(), CHAIN_ID);

    // connect: flag persisted, values loaded
    harness.connect().await;
    let snapshot = harness.controller.snapshot();
    assert_eq!(snapshot.raffle_address.as_deref(), Some(CONTRACT));
    assert_eq!(snapshot.stats.players, 7);
    assert_eq!(
        snapshot.wallet,
        ConnectorView::Connected {
            short: String::from("0xabcd...6789")
        }
    );
    let on_disk = FileStorage::open(dir.path().join(STORAGE_FILE)).unwrap();
    assert!(on_disk.get_item(CONNECTED_KEY).is_some());

    // enter: one payment, one toast, players updated
    harness.controller.enter();
    harness.settle().await;
    let raffle = harness.controller.provider().raffle.clone();
    assert_eq!(raffle.paid_fees(), vec![250_000_000]);
    let toasts: Vec<Notification> = harness
        .controller
        .snapshot()
        .toasts
        .into_iter()
        .map(|t| t.notification)
        .collect();
    assert_eq!(toasts, vec![Notification::transaction_complete()]);
    assert_eq!(harness.controller.snapshot().stats.players, 8);

    // lock: flag removed, panel torn down
    harness.controller.disconnect();
    let account = harness.account_changes.recv().await.unwrap();
    let effect = harness.controller.on_account_changed(account).unwrap();
    harness.controller.run_connector_effect(effect);
    assert!(!harness.controller.provider().is_enabled());
    let on_disk = FileStorage::open(dir.path().join(STORAGE_FILE)).unwrap();
    assert_eq!(on_disk.get_item(CONNECTED_KEY), None);
    assert_eq!(harness.controller.snapshot().raffle_address, None);
}

#[tokio::test]
async fn restart_with_saved_flag__reconnects_on_mount() {
    let dir = TempDir::new("raffle_flow").unwrap();
    {
        let mut first = Harness::start(dir.path(), CHAIN_ID);
        first.connect().await;
    }

    let mut second = Harness::start(dir.path(), CHAIN_ID);
    let effect = second.controller.mount().unwrap();
    second.enable(effect).await;

    assert_eq!(second.controller.provider().enable_calls(), 1);
    assert_eq!(second.controller.snapshot().stats.entrance_fee, 250_000_000);
}

#[tokio::test]
async fn unregistered_chain__shows_notice_and_never_calls_contract() {
    let dir = TempDir::new("raffle_flow").unwrap();
    let mut harness = Harness::start(dir.path(), 31337);

    harness.connect().await;
    harness.controller.enter();
    harness.controller.refresh();

    let snapshot = harness.controller.snapshot();
    assert_eq!(snapshot.raffle_address, None);
    assert!(!snapshot.can_enter);
    let calls = harness.controller.provider().raffle.calls();
    assert_eq!(calls.entrance_fee + calls.number_of_players + calls.recent_winner, 0);
    assert_eq!(calls.enter_raffle, 0);
}

#[tokio::test]
async fn account_switch__keeps_session_and_flag() {
    let dir = TempDir::new("raffle_flow").unwrap();
    let mut harness = Harness::start(dir.path(), CHAIN_ID);
    harness.connect().await;

    harness
        .controller
        .provider_mut()
        .switch_account("0x9999999999999999999999999999999999999999999999999999999999990000");
    let account = harness.account_changes.recv().await.unwrap();
    let effect = harness.controller.on_account_changed(account);

    assert_eq!(effect, None);
    assert_eq!(
        harness.controller.snapshot().wallet,
        ConnectorView::Connected {
            short: String::from("0x9999...0000")
        }
    );
    assert!(harness.controller.connector().storage().get_item(CONNECTED_KEY).is_some());
}
