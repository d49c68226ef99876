//! Accounts as seen by the verification core.

use arkona_crypto::PublicKey;
use serde::{Deserialize, Serialize};

/// Materialised account state.
///
/// A sender whose account is not yet materialised (a cold wallet) simply has
/// no `Account` value; collaborators return `None` for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    /// Ledger address.
    pub address: String,
    /// Public key, once the account has sent at least one transaction.
    pub public_key: Option<PublicKey>,
    /// Confirmed balance in base units.
    pub balance: u64,
    /// Whether this account is a registered delegate.
    pub is_delegate: bool,
    /// Delegate username, when registered.
    pub username: Option<String>,
}

impl Account {
    /// Account as materialised by a first-seen public key.
    #[must_use]
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self {
            address: public_key.to_string(),
            public_key: Some(public_key),
            ..Self::default()
        }
    }
}
