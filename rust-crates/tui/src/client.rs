use crate::{
    connector::{
        ConnectorEffect,
        ConnectorView,
        WalletConnector,
    },
    contract::RaffleSource,
    notifications::{
        Toast,
        ToastQueue,
    },
    panel::{
        Effect,
        EntryStage,
        PanelEvent,
        RafflePanel,
        RaffleStats,
        run_effect,
    },
    session::{
        AccountChanges,
        KeystoreProvider,
        SessionInfo,
        WalletProvider,
    },
    storage::{
        ClientStorage,
        FileStorage,
        STORAGE_FILE,
    },
    ui,
    wallets,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::event::Event;
use deployments::{
    AddressRegistry,
    RegistryStore,
};
use futures::Stream;
use std::{
    path::PathBuf,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";

const TICK_INTERVAL: Duration = Duration::from_millis(250);
const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Testnet { url: String },
    Devnet { url: String },
    LocalNode { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Testnet { url }
            | NetworkTarget::Devnet { url }
            | NetworkTarget::LocalNode { url } => url,
        }
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    ForcKeystore { owner: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallets: WalletConfig,
    pub registry_path: PathBuf,
    pub storage_dir: PathBuf,
}

/// Everything the UI needs for one frame.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub wallet: ConnectorView,
    pub chain_id: Option<u64>,
    pub raffle_address: Option<String>,
    pub connected: bool,
    pub stats: RaffleStats,
    pub entry_stage: Option<EntryStage>,
    pub can_enter: bool,
    pub busy: bool,
    pub spinner_frame: usize,
    pub toasts: Vec<Toast>,
    pub status: String,
    pub errors: Vec<String>,
}

/// Outcome of a wallet request that ran on a worker.
pub enum ConnectorEvent<T> {
    Enabled(Result<T>),
}

/// Receivers for everything spawned workers report back to the app loop.
pub struct WorkerEvents<T> {
    pub panel: mpsc::UnboundedReceiver<PanelEvent>,
    pub connector: mpsc::UnboundedReceiver<ConnectorEvent<T>>,
}

pub struct AppController<P: WalletProvider + RaffleSource, S> {
    provider: P,
    connector: WalletConnector<S>,
    panel: RafflePanel,
    registry: AddressRegistry,
    raffle: Option<P::Raffle>,
    toasts: ToastQueue,
    panel_tx: mpsc::UnboundedSender<PanelEvent>,
    connector_tx: mpsc::UnboundedSender<ConnectorEvent<P::Session>>,
    spinner_frame: usize,
    status: String,
    errors: Vec<String>,
}

impl<P, S> AppController<P, S>
where
    P: WalletProvider + RaffleSource,
    S: ClientStorage,
{
    pub fn new(
        provider: P,
        storage: S,
        registry: AddressRegistry,
    ) -> (Self, WorkerEvents<P::Session>) {
        let (panel_tx, panel) = mpsc::unbounded_channel();
        let (connector_tx, connector) = mpsc::unbounded_channel();
        let controller = Self {
            provider,
            connector: WalletConnector::new(storage),
            panel: RafflePanel::new(),
            registry,
            raffle: None,
            toasts: ToastQueue::default(),
            panel_tx,
            connector_tx,
            spinner_frame: 0,
            status: String::from("Press c to connect your wallet"),
            errors: Vec::new(),
        };
        (controller, WorkerEvents { panel, connector })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn connector(&self) -> &WalletConnector<S> {
        &self.connector
    }

    pub fn panel(&self) -> &RafflePanel {
        &self.panel
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn mount(&mut self) -> Option<ConnectorEffect> {
        self.connector.mount(self.provider.is_enabled())
    }

    pub fn connect(&mut self) -> Option<ConnectorEffect> {
        let effect = self.connector.connect();
        if effect.is_some() {
            self.set_status("Connecting wallet...");
        }
        effect
    }

    /// Runs a connector effect and whatever follow-up it causes. Enabling is
    /// handed to a worker; its outcome arrives as a [`ConnectorEvent`].
    pub fn run_connector_effect(&mut self, effect: ConnectorEffect) {
        let mut next = Some(effect);
        while let Some(effect) = next.take() {
            next = match effect {
                ConnectorEffect::Enable => {
                    self.spawn_enable();
                    None
                }
                ConnectorEffect::Deactivate => self.deactivate(),
            };
        }
    }

    fn spawn_enable(&mut self) {
        let request = self.provider.request_enable();
        let tx = self.connector_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(ConnectorEvent::Enabled(request.await));
        });
    }

    pub fn on_connector_event(&mut self, event: ConnectorEvent<P::Session>) {
        match event {
            ConnectorEvent::Enabled(Ok(session)) => {
                let info = self.provider.activate(session);
                self.on_enabled(info);
            }
            ConnectorEvent::Enabled(Err(e)) => {
                self.connector.enable_failed();
                self.push_error(format!("Wallet connection failed: {e:#}"));
            }
        }
    }

    fn on_enabled(&mut self, info: SessionInfo) {
        let SessionInfo { account, chain_id } = info;
        if let Err(e) = self.connector.enable_succeeded(account) {
            self.push_error(format!("Saving connection flag failed: {e:#}"));
        }
        self.panel.set_network(Some(chain_id), &self.registry);
        self.raffle = None;
        if let Some(address) = self.panel.address().map(str::to_owned) {
            match self.provider.raffle_at(&address) {
                Ok(raffle) => self.raffle = Some(raffle),
                Err(e) => {
                    self.push_error(format!("Binding raffle {address} failed: {e:#}"));
                    self.panel.set_network(None, &self.registry);
                }
            }
        }
        self.set_status(format!("Connected to chain {chain_id}"));
        let effect = self.panel.connection_changed(true);
        self.spawn_panel_effect(effect);
    }

    /// Tears the session down; returns the effect of re-mounting the connector.
    fn deactivate(&mut self) -> Option<ConnectorEffect> {
        self.provider.deactivate();
        self.raffle = None;
        self.panel.connection_changed(false);
        self.panel.set_network(None, &self.registry);
        self.set_status("Wallet disconnected");
        self.mount()
    }

    pub fn on_account_changed(&mut self, account: Option<String>) -> Option<ConnectorEffect> {
        match self.connector.account_changed(account) {
            Ok(effect) => effect,
            Err(e) => {
                self.push_error(format!("Clearing connection flag failed: {e:#}"));
                Some(ConnectorEffect::Deactivate)
            }
        }
    }

    pub fn enter(&mut self) {
        match self.panel.request_entry() {
            Ok(effect) => {
                self.set_status("Entering raffle...");
                self.spawn_panel_effect(Some(effect));
            }
            Err(rejection) => {
                warn!(%rejection, "entry rejected");
                self.set_status(format!("Cannot enter: {rejection}"));
            }
        }
    }

    pub fn refresh(&mut self) {
        let effect = self.panel.request_refresh();
        if effect.is_some() {
            self.set_status("Refreshing raffle...");
        }
        self.spawn_panel_effect(effect);
    }

    pub fn disconnect(&mut self) {
        self.provider.disconnect();
    }

    pub fn on_panel_event(&mut self, event: PanelEvent) {
        match &event {
            PanelEvent::StatsLoaded(_) => self.set_status("Raffle refreshed"),
            PanelEvent::StatsFailed(reason) => {
                self.push_error(format!("Refreshing raffle failed: {reason}"))
            }
            PanelEvent::EntrySubmitted => self.set_status("Entry submitted; waiting for confirmation..."),
            PanelEvent::EntryConfirmed => self.set_status("Transaction complete!"),
            PanelEvent::EntryFailed(reason) => {
                self.push_error(format!("Entering raffle failed: {reason}"))
            }
        }
        let effect = self.panel.apply(event, &mut self.toasts);
        self.spawn_panel_effect(effect);
    }

    fn spawn_panel_effect(&mut self, effect: Option<Effect>) {
        let Some(effect) = effect else {
            return;
        };
        let Some(raffle) = self.raffle.clone() else {
            let failure = match effect {
                Effect::Refresh => PanelEvent::StatsFailed(String::from("no raffle bound")),
                Effect::SubmitEntry { .. } => {
                    PanelEvent::EntryFailed(String::from("no raffle bound"))
                }
            };
            let _ = self.panel_tx.send(failure);
            return;
        };
        let tx = self.panel_tx.clone();
        tokio::spawn(async move {
            run_effect(&raffle, effect, &tx).await;
        });
    }

    /// Expires toasts and advances the spinner. Returns whether a redraw is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self.toasts.expire(now);
        let busy = self.panel.is_busy() || self.connector.is_enabling();
        if busy {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
        expired || busy
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            wallet: self.connector.view(),
            chain_id: self.panel.chain_id(),
            raffle_address: self.panel.address().map(str::to_owned),
            connected: self.panel.is_connected(),
            stats: self.panel.stats().clone(),
            entry_stage: self.panel.entry_stage(),
            can_enter: self.panel.can_enter(),
            busy: self.panel.is_busy(),
            spinner_frame: self.spinner_frame,
            toasts: self.toasts.visible().cloned().collect(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status);
    }

    fn push_error(&mut self, message: String) {
        error!("{}", message);
        self.errors.push(message);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let registry = RegistryStore::new(&config.registry_path)
        .load()
        .map_err(|e| eyre!(e))
        .wrap_err("Loading address registry failed")?;
    let WalletConfig::ForcKeystore { owner, dir } = &config.wallets;
    let descriptor = wallets::find_wallet(dir, owner)?;
    let signer = wallets::unlock_signer(&descriptor)?;
    let (provider, mut account_changes) = KeystoreProvider::new(config.network.url(), signer);
    let storage = FileStorage::open(config.storage_dir.join(STORAGE_FILE))
        .wrap_err("Opening client storage failed")?;

    let (mut controller, mut worker_events) = AppController::new(provider, storage, registry);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        &mut controller,
        &mut ui_state,
        &mut input_events,
        &mut account_changes,
        &mut worker_events,
    )
    .await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<P, S, I>(
    controller: &mut AppController<P, S>,
    ui_state: &mut ui::UiState,
    input_events: &mut I,
    account_changes: &mut AccountChanges,
    worker_events: &mut WorkerEvents<P::Session>,
) -> Result<()>
where
    P: WalletProvider + RaffleSource,
    S: ClientStorage,
    I: Stream<Item = std::io::Result<Event>> + Unpin,
{
    info!("Running app loop");
    if let Some(effect) = controller.mount() {
        controller.run_connector_effect(effect);
    }
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;
    let mut ticker = time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            Some(event) = worker_events.connector.recv() => {
                controller.on_connector_event(event);
            }
            Some(event) = worker_events.panel.recv() => {
                controller.on_panel_event(event);
            }
            Some(account) = account_changes.recv() => {
                if let Some(effect) = controller.on_account_changed(account) {
                    controller.run_connector_effect(effect);
                }
            }
            _ = ticker.tick() => {
                if !controller.tick(Instant::now()) {
                    continue;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let Some(ev) = ui::interpret_event(raw_ev?) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Connect => {
                        if let Some(effect) = controller.connect() {
                            controller.run_connector_effect(effect);
                        }
                    }
                    ui::UserEvent::Enter => controller.enter(),
                    ui::UserEvent::Refresh => controller.refresh(),
                    ui::UserEvent::Disconnect => controller.disconnect(),
                    ui::UserEvent::Redraw => {}
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    info!("App loop finished");
    Ok(())
}
