//! Header component: owns the "connected" flag and the connect control.

use crate::storage::{
    CONNECTED_KEY,
    ClientStorage,
    INJECTED_CONNECTOR,
};
use color_eyre::eyre::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectorEffect {
    Enable,
    Deactivate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectorView {
    Connected { short: String },
    Connect { disabled: bool },
}

pub struct WalletConnector<S> {
    storage: S,
    account: Option<String>,
    enabling: bool,
}

impl<S: ClientStorage> WalletConnector<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            account: None,
            enabling: false,
        }
    }

    /// Reconnects when a previous session left the flag behind and nothing is
    /// connected yet.
    pub fn mount(&mut self, is_enabled: bool) -> Option<ConnectorEffect> {
        if is_enabled || self.enabling {
            return None;
        }
        self.storage.get_item(CONNECTED_KEY)?;
        tracing::info!("previous session found, reconnecting");
        self.enabling = true;
        Some(ConnectorEffect::Enable)
    }

    pub fn connect(&mut self) -> Option<ConnectorEffect> {
        if self.enabling || self.account.is_some() {
            return None;
        }
        self.enabling = true;
        Some(ConnectorEffect::Enable)
    }

    pub fn enable_succeeded(&mut self, account: impl Into<String>) -> Result<()> {
        self.enabling = false;
        self.account = Some(account.into());
        self.storage.set_item(CONNECTED_KEY, INJECTED_CONNECTOR)
    }

    pub fn enable_failed(&mut self) {
        self.enabling = false;
    }

    pub fn account_changed(
        &mut self,
        account: Option<String>,
    ) -> Result<Option<ConnectorEffect>> {
        tracing::info!("Account changed to {account:?}");
        match account {
            Some(account) => {
                self.account = Some(account);
                Ok(None)
            }
            None => {
                self.account = None;
                self.storage.remove_item(CONNECTED_KEY)?;
                Ok(Some(ConnectorEffect::Deactivate))
            }
        }
    }

    pub fn is_enabling(&self) -> bool {
        self.enabling
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn view(&self) -> ConnectorView {
        match &self.account {
            Some(account) => ConnectorView::Connected {
                short: truncate_account(account),
            },
            None => ConnectorView::Connect {
                disabled: self.enabling,
            },
        }
    }
}

/// `0x1234...abcd`: first six and last four characters.
pub fn truncate_account(account: &str) -> String {
    let chars: Vec<char> = account.chars().collect();
    if chars.len() <= 10 {
        return account.to_owned();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
