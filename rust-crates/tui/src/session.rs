use color_eyre::eyre::{
    Result,
    WrapErr,
};
use fuels::{
    accounts::ViewOnlyAccount,
    prelude::{
        AssetId,
        Provider,
        Wallet,
        private_key::PrivateKeySigner,
    },
    types::Address,
};
use tokio::sync::mpsc;

/// Account-change notifications. `None` means the wallet no longer exposes an
/// account.
pub type AccountChanges = mpsc::UnboundedReceiver<Option<String>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub account: String,
    pub chain_id: u64,
}

/// Source of truth for connection status.
pub trait WalletProvider {
    /// Authorized session produced by [`WalletProvider::request_enable`].
    type Session: Send + 'static;

    fn chain_id(&self) -> Option<u64>;
    fn account(&self) -> Option<String>;
    fn is_enabled(&self) -> bool;
    /// Authorization request. The future owns everything it needs so it can run
    /// on a worker while the app loop keeps handling input.
    fn request_enable(&self) -> impl Future<Output = Result<Self::Session>> + Send + 'static;
    /// Adopts a session returned by `request_enable`.
    fn activate(&mut self, session: Self::Session) -> SessionInfo;
    fn deactivate(&mut self);
    /// Locks the wallet; subscribers are told the account is gone.
    fn disconnect(&mut self);
}

#[derive(Clone)]
pub struct ActiveSession {
    pub wallet: Wallet,
    pub chain_id: u64,
    pub base_asset_id: AssetId,
    pub account: String,
}

/// Keystore-backed wallet that authorizes by binding its signer to a node.
pub struct KeystoreProvider {
    url: String,
    signer: PrivateKeySigner,
    session: Option<ActiveSession>,
    account_tx: mpsc::UnboundedSender<Option<String>>,
}

impl KeystoreProvider {
    pub fn new(url: impl Into<String>, signer: PrivateKeySigner) -> (Self, AccountChanges) {
        let (account_tx, account_rx) = mpsc::unbounded_channel();
        let provider = Self {
            url: url.into(),
            signer,
            session: None,
            account_tx,
        };
        (provider, account_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }
}

pub fn account_to_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address))
}

impl WalletProvider for KeystoreProvider {
    type Session = ActiveSession;

    fn chain_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.chain_id)
    }

    fn account(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.account.clone())
    }

    fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    fn request_enable(&self) -> impl Future<Output = Result<ActiveSession>> + Send + 'static {
        let url = self.url.clone();
        let signer = self.signer.clone();
        async move {
            tracing::info!("Connecting to node at URL: {url}");
            let provider = Provider::connect(&url)
                .await
                .wrap_err_with(|| format!("Failed to connect to provider at {url}"))?;
            let consensus_parameters = provider
                .consensus_parameters()
                .await
                .wrap_err("Failed to fetch consensus parameters")?;
            let chain_id = u64::from(consensus_parameters.chain_id());
            let base_asset_id = *consensus_parameters.base_asset_id();

            let wallet = Wallet::new(signer, provider);
            let address: Address = wallet.address().into();
            Ok(ActiveSession {
                wallet,
                chain_id,
                base_asset_id,
                account: account_to_hex(address),
            })
        }
    }

    fn activate(&mut self, session: ActiveSession) -> SessionInfo {
        let info = SessionInfo {
            account: session.account.clone(),
            chain_id: session.chain_id,
        };
        tracing::info!(account = %info.account, chain_id = info.chain_id, "wallet enabled");
        self.session = Some(session);
        info
    }

    fn deactivate(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("wallet deactivated");
        }
    }

    fn disconnect(&mut self) {
        tracing::info!("wallet locked by user");
        let _ = self.account_tx.send(None);
    }
}
