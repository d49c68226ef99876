//! Transactions and their canonical byte form.

use core::str::FromStr;

use arkona_crypto::{Hash, KeyPair, ParseError, PublicKey, Signature};
use parity_scale_codec::Encode;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{account::Account, block::BlockId, short_id};

/// Numeric transaction id, derived from the canonical bytes.
#[derive(
    Debug,
    derive_more::Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    parity_scale_codec::Encode,
    parity_scale_codec::Decode,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TransactionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for TransactionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|err| ParseError(format!("Invalid transaction id: {err}")))
    }
}

/// Transaction validation failure.
#[derive(Debug, Clone, Copy, displaydoc::Display, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// Transaction has no signature
    MissingSignature,
    /// Failed to verify transaction signature
    BadSignature,
    /// Sender account not found
    UnknownSender,
    /// Account does not have enough balance: {balance} < {required}
    InsufficientBalance {
        /// Confirmed sender balance.
        balance: u64,
        /// Amount plus fee demanded by the transaction.
        required: u64,
    },
}

/// A value transfer, ordered inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Derived id; absent until computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    /// Seconds since the chain epoch.
    pub timestamp: u64,
    /// Key of the sending account.
    pub sender_public_key: PublicKey,
    /// Receiving address, when the transfer has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Transferred amount in base units.
    pub amount: u64,
    /// Fee in base units.
    pub fee: u64,
    /// Sender signature over the signable bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    /// Id of the block this transaction was included in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
}

impl Transaction {
    /// Bytes covered by the sender signature.
    #[must_use]
    pub fn signable_bytes(&self) -> Vec<u8> {
        (
            self.timestamp,
            self.sender_public_key,
            &self.recipient,
            self.amount,
            self.fee,
        )
            .encode()
    }

    /// Canonical bytes: the signable bytes followed by the signature.
    /// This is the form payload hashing and id derivation consume.
    ///
    /// # Errors
    /// If the transaction carries no signature.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let signature = self.signature.ok_or(TransactionError::MissingSignature)?;
        let mut bytes = self.signable_bytes();
        bytes.extend_from_slice(&signature.to_bytes());
        Ok(bytes)
    }

    /// Derive the id from the canonical bytes.
    ///
    /// # Errors
    /// If the transaction carries no signature.
    pub fn calculate_id(&self) -> Result<TransactionId, TransactionError> {
        let bytes = self.canonical_bytes()?;
        Ok(TransactionId(short_id(&Hash::new(bytes))))
    }

    /// Sign with the sender key pair, replacing any existing signature.
    pub fn sign(&mut self, key_pair: &KeyPair) {
        self.signature = Some(key_pair.sign(&self.signable_bytes()));
    }

    /// Verify this transaction against its sender account.
    ///
    /// `sender` is `None` for cold wallets; those are rejected, since no
    /// transfer kind in this model admits an absent sender.
    ///
    /// # Errors
    /// On a missing or mismatching signature, an unknown sender, or an
    /// insufficient confirmed balance.
    pub fn verify(&self, sender: Option<&Account>) -> Result<(), TransactionError> {
        let signature = self.signature.ok_or(TransactionError::MissingSignature)?;
        self.sender_public_key
            .verify(&self.signable_bytes(), &signature)
            .map_err(|_| TransactionError::BadSignature)?;

        let sender = sender.ok_or(TransactionError::UnknownSender)?;
        let required = self.amount.saturating_add(self.fee);
        if sender.balance < required {
            return Err(TransactionError::InsufficientBalance {
                balance: sender.balance,
                required,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(key_pair: &KeyPair, amount: u64) -> Transaction {
        let mut tx = Transaction {
            id: None,
            timestamp: 40,
            sender_public_key: *key_pair.public_key(),
            recipient: Some("1234567890".to_owned()),
            amount,
            fee: 10_000_000,
            signature: None,
            block_id: None,
        };
        tx.sign(key_pair);
        tx
    }

    fn funded_sender(key_pair: &KeyPair, balance: u64) -> Account {
        Account {
            balance,
            ..Account::from_public_key(*key_pair.public_key())
        }
    }

    #[test]
    fn id_is_stable_and_signature_dependent() {
        let key_pair = KeyPair::from_passphrase("sender one");
        let tx = transfer(&key_pair, 100);
        let id = tx.calculate_id().expect("Valid");
        assert_eq!(tx.calculate_id().expect("Valid"), id);

        let mut resigned = tx.clone();
        resigned.timestamp += 1;
        resigned.sign(&key_pair);
        assert_ne!(resigned.calculate_id().expect("Valid"), id);
    }

    #[test]
    fn unsigned_transaction_has_no_canonical_form() {
        let key_pair = KeyPair::from_passphrase("sender one");
        let mut tx = transfer(&key_pair, 100);
        tx.signature = None;
        assert_eq!(tx.calculate_id(), Err(TransactionError::MissingSignature));
    }

    #[test]
    fn verify_accepts_funded_sender() {
        let key_pair = KeyPair::from_passphrase("sender one");
        let tx = transfer(&key_pair, 100);
        let sender = funded_sender(&key_pair, 20_000_000);
        tx.verify(Some(&sender)).expect("Valid");
    }

    #[test]
    fn verify_rejects_cold_wallet_sender() {
        let key_pair = KeyPair::from_passphrase("sender one");
        let tx = transfer(&key_pair, 100);
        assert_eq!(tx.verify(None), Err(TransactionError::UnknownSender));
    }

    #[test]
    fn verify_rejects_underfunded_sender() {
        let key_pair = KeyPair::from_passphrase("sender one");
        let tx = transfer(&key_pair, 100);
        let sender = funded_sender(&key_pair, 50);
        assert_eq!(
            tx.verify(Some(&sender)),
            Err(TransactionError::InsufficientBalance {
                balance: 50,
                required: 10_000_100,
            })
        );
    }

    #[test]
    fn verify_rejects_tampered_amount() {
        let key_pair = KeyPair::from_passphrase("sender one");
        let mut tx = transfer(&key_pair, 100);
        tx.amount = 1_000_000_000;
        let sender = funded_sender(&key_pair, u64::MAX);
        assert_eq!(tx.verify(Some(&sender)), Err(TransactionError::BadSignature));
    }
}
