//! Loading the delegate keypairs this node may forge with.
//!
//! Runs once at startup. Each configured entry is decrypted with the node
//! passphrase, checked against its declared public key and matched to an
//! on-chain delegate account. The first failing entry aborts the whole
//! load; entries for accounts that are not delegates are skipped silently.

use std::collections::HashMap;

use arkona_config::forging;
use arkona_crypto::{encryption, KeyPair, PublicKey};

use crate::modules::AccountLedger;

/// Failure to load the configured forging secrets.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum ForgingError {
    /// Invalid encryptedSecret for publicKey: {0}
    InvalidEncryptedSecret(PublicKey),
    /// Public keys do not match
    PublicKeyMismatch,
    /// Account with public key: {0} not found
    AccountNotFound(PublicKey),
    /// {0}
    Accounts(eyre::Report),
}

/// Process-lifetime store of the keypairs this node forges with,
/// keyed by public key.
#[derive(Debug, Default)]
pub struct KeypairRegistry {
    keypairs: HashMap<PublicKey, KeyPair>,
}

impl KeypairRegistry {
    /// Store a keypair under its public key.
    pub fn insert(&mut self, key_pair: KeyPair) {
        self.keypairs.insert(*key_pair.public_key(), key_pair);
    }

    /// Keypair for the given public key, if loaded.
    #[must_use]
    pub fn get(&self, public_key: &PublicKey) -> Option<&KeyPair> {
        self.keypairs.get(public_key)
    }

    /// Whether a keypair is loaded for the given public key.
    #[must_use]
    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.keypairs.contains_key(public_key)
    }

    /// Number of loaded keypairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    /// Whether no keypairs are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }

    /// Public keys of all loaded keypairs.
    pub fn public_keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.keypairs.keys()
    }
}

fn decode_sealed(entry: &forging::EncryptedEntry) -> Option<encryption::SealedSecret> {
    Some(encryption::SealedSecret {
        version: entry.version,
        salt: hex::decode(&entry.salt).ok()?,
        nonce: hex::decode(&entry.iv).ok()?,
        tag: hex::decode(&entry.tag).ok()?,
        ciphertext: hex::decode(&entry.encrypted_secret).ok()?,
    })
}

/// Decrypt the configured forging secrets and match them to on-chain
/// delegate accounts.
///
/// # Errors
/// On the first entry that fails to decrypt, derives an unexpected public
/// key, or names an account that does not exist. Infrastructure failures
/// of the account lookup propagate verbatim.
pub async fn load_delegates(
    configuration: &forging::Configuration,
    accounts: &dyn AccountLedger,
) -> Result<KeypairRegistry, ForgingError> {
    let mut registry = KeypairRegistry::default();

    if !configuration.force {
        arkona_logger::info!("Forging disabled by configuration");
        return Ok(registry);
    }
    let Some(entries) = configuration.secrets.as_ref() else {
        return Ok(registry);
    };
    if entries.is_empty() {
        return Ok(registry);
    }

    arkona_logger::info!(count = entries.len(), "Loading delegates from encrypted secrets");

    for entry in entries {
        let sealed = decode_sealed(entry)
            .ok_or(ForgingError::InvalidEncryptedSecret(entry.public_key))?;
        let secret = encryption::open(&configuration.passphrase, &sealed)
            .map_err(|_| ForgingError::InvalidEncryptedSecret(entry.public_key))?;
        let passphrase = core::str::from_utf8(&secret)
            .map_err(|_| ForgingError::InvalidEncryptedSecret(entry.public_key))?;

        let key_pair = KeyPair::from_passphrase(passphrase);
        if *key_pair.public_key() != entry.public_key {
            return Err(ForgingError::PublicKeyMismatch);
        }

        let account = accounts
            .account_by_public_key(entry.public_key)
            .await
            .map_err(ForgingError::Accounts)?
            .ok_or(ForgingError::AccountNotFound(entry.public_key))?;

        if !account.is_delegate {
            arkona_logger::warn!(account = %entry.public_key, "Account is not a delegate");
            continue;
        }

        arkona_logger::info!(delegate = %entry.public_key, "Forging enabled");
        registry.insert(key_pair);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use arkona_data_model::prelude::Account;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct TestAccounts {
        accounts: Mutex<HashMap<PublicKey, Account>>,
    }

    impl TestAccounts {
        fn register(&self, public_key: PublicKey, is_delegate: bool) {
            let account = Account {
                is_delegate,
                ..Account::from_public_key(public_key)
            };
            self.accounts.lock().insert(public_key, account);
        }
    }

    #[async_trait]
    impl AccountLedger for TestAccounts {
        async fn account_by_public_key(
            &self,
            public_key: PublicKey,
        ) -> eyre::Result<Option<Account>> {
            Ok(self.accounts.lock().get(&public_key).cloned())
        }
    }

    const NODE_PASSPHRASE: &str = "node default passphrase";

    fn entry_for(delegate_passphrase: &str) -> (forging::EncryptedEntry, PublicKey) {
        let key_pair = KeyPair::from_passphrase(delegate_passphrase);
        let sealed = encryption::seal(NODE_PASSPHRASE, delegate_passphrase.as_bytes());
        let entry = forging::EncryptedEntry {
            public_key: *key_pair.public_key(),
            encrypted_secret: hex::encode(&sealed.ciphertext),
            iv: hex::encode(&sealed.nonce),
            salt: hex::encode(&sealed.salt),
            tag: hex::encode(&sealed.tag),
            version: sealed.version,
        };
        (entry, *key_pair.public_key())
    }

    fn configuration(entries: Option<Vec<forging::EncryptedEntry>>) -> forging::Configuration {
        forging::Configuration {
            force: true,
            passphrase: NODE_PASSPHRASE.to_owned(),
            secrets: entries,
        }
    }

    #[tokio::test]
    async fn force_disabled_loads_nothing() {
        let accounts = TestAccounts::default();
        let entries: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|passphrase| {
                let (entry, public_key) = entry_for(passphrase);
                accounts.register(public_key, true);
                entry
            })
            .collect();
        let mut configuration = configuration(Some(entries));
        configuration.force = false;

        let registry = load_delegates(&configuration, &accounts).await.expect("Valid");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn empty_secret_list_loads_nothing() {
        let accounts = TestAccounts::default();
        let registry = load_delegates(&configuration(Some(Vec::new())), &accounts)
            .await
            .expect("Valid");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn absent_secret_list_loads_nothing() {
        let accounts = TestAccounts::default();
        let registry = load_delegates(&configuration(None), &accounts).await.expect("Valid");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn truncated_ciphertext_fails_with_its_public_key() {
        let accounts = TestAccounts::default();
        let (mut entry, public_key) = entry_for("delegate under test");
        accounts.register(public_key, true);
        entry.encrypted_secret.truncate(4);

        let err = load_delegates(&configuration(Some(vec![entry])), &accounts)
            .await
            .expect_err("Must fail");
        assert_eq!(
            err.to_string(),
            format!("Invalid encryptedSecret for publicKey: {public_key}")
        );
    }

    #[tokio::test]
    async fn wrong_declared_public_key_fails() {
        let accounts = TestAccounts::default();
        let (mut entry, _) = entry_for("delegate under test");
        let (_, other_key) = entry_for("somebody else");
        entry.public_key = other_key;
        accounts.register(other_key, true);

        let err = load_delegates(&configuration(Some(vec![entry])), &accounts)
            .await
            .expect_err("Must fail");
        assert_eq!(err.to_string(), "Public keys do not match");
    }

    #[tokio::test]
    async fn missing_account_fails() {
        let accounts = TestAccounts::default();
        let (entry, public_key) = entry_for("delegate without account");

        let err = load_delegates(&configuration(Some(vec![entry])), &accounts)
            .await
            .expect_err("Must fail");
        assert_eq!(
            err.to_string(),
            format!("Account with public key: {public_key} not found")
        );
    }

    #[tokio::test]
    async fn non_delegate_account_is_skipped_silently() {
        let accounts = TestAccounts::default();
        let (entry, public_key) = entry_for("plain account holder");
        accounts.register(public_key, false);

        let registry = load_delegates(&configuration(Some(vec![entry])), &accounts)
            .await
            .expect("Valid");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn three_valid_entries_load_three_keypairs() {
        let accounts = TestAccounts::default();
        let mut keys = Vec::new();
        let entries: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|passphrase| {
                let (entry, public_key) = entry_for(passphrase);
                accounts.register(public_key, true);
                keys.push(public_key);
                entry
            })
            .collect();

        let registry = load_delegates(&configuration(Some(entries)), &accounts)
            .await
            .expect("Valid");
        assert_eq!(registry.len(), 3);
        for key in keys {
            assert!(registry.contains(&key));
            assert_eq!(*registry.get(&key).expect("Valid").public_key(), key);
        }
    }

    #[tokio::test]
    async fn a_full_round_of_delegates_loads() {
        let accounts = TestAccounts::default();
        let entries: Vec<_> = (0..101)
            .map(|index| {
                let (entry, public_key) = entry_for(&format!("round delegate {index}"));
                accounts.register(public_key, true);
                entry
            })
            .collect();

        let registry = load_delegates(&configuration(Some(entries)), &accounts)
            .await
            .expect("Valid");
        assert_eq!(registry.len(), 101);
    }

    #[tokio::test]
    async fn first_failing_entry_aborts_the_sweep() {
        let accounts = TestAccounts::default();
        let (good, good_key) = entry_for("healthy delegate");
        accounts.register(good_key, true);
        let (mut broken, broken_key) = entry_for("broken delegate");
        accounts.register(broken_key, true);
        broken.tag = "00".repeat(16);

        let err = load_delegates(&configuration(Some(vec![good, broken])), &accounts)
            .await
            .expect_err("Must fail");
        assert!(matches!(err, ForgingError::InvalidEncryptedSecret(key) if key == broken_key));
    }
}
