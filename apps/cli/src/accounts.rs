//! File-backed linked-account store.
//!
//! ```toml
//! [[accounts]]
//! id = "main"
//! login_id = "creator@example.invalid"
//! password = "..."
//! status = "CONNECTED"
//! ```

use std::path::PathBuf;

use assetlane_protocol::LinkedAccount;
use assetlane_publish::{AccountStore, AccountStoreError};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<LinkedAccount>,
}

/// Reads the accounts file on every lookup, so edits are picked up
/// without restarting.
#[derive(Debug, Clone)]
pub struct TomlAccountStore {
    path: PathBuf,
}

impl TomlAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<AccountsFile, AccountStoreError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AccountStoreError(format!("{}: {e}", self.path.display())))?;
        toml::from_str(&content)
            .map_err(|e| AccountStoreError(format!("{}: {e}", self.path.display())))
    }
}

impl AccountStore for TomlAccountStore {
    fn lookup(&self, account_id: &str) -> Result<Option<LinkedAccount>, AccountStoreError> {
        Ok(self
            .read()?
            .accounts
            .into_iter()
            .find(|a| a.id == account_id))
    }
}
