//! Read-only access to linked accounts.
//!
//! The engine never caches or mutates accounts. It looks the account up
//! once per session and drops it when the session ends.

use std::collections::HashMap;

use assetlane_protocol::LinkedAccount;

/// Failure to read from the account store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("account store error: {0}")]
pub struct AccountStoreError(pub String);

/// Source of linked-account credentials and connectivity status.
pub trait AccountStore: Send + Sync {
    /// Returns the account with `account_id`, or `None` if unknown.
    fn lookup(&self, account_id: &str) -> Result<Option<LinkedAccount>, AccountStoreError>;
}

/// Fixed in-memory account store.
#[derive(Debug, Default, Clone)]
pub struct StaticAccountStore {
    accounts: HashMap<String, LinkedAccount>,
}

impl StaticAccountStore {
    pub fn new(accounts: impl IntoIterator<Item = LinkedAccount>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for StaticAccountStore {
    fn lookup(&self, account_id: &str) -> Result<Option<LinkedAccount>, AccountStoreError> {
        Ok(self.accounts.get(account_id).cloned())
    }
}
