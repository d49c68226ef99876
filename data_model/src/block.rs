//! Blocks, their canonical byte form and the compact wire form.
//!
//! A [`Block`] is fully specified: every consensus field carries a value.
//! Its wire sibling [`BlockDraft`] leaves the canonical-defaultable fields
//! optional, which is how peers gossip blocks: fields equal to their
//! canonical default are simply not transmitted.

use core::str::FromStr;

use arkona_crypto::{Hash, KeyPair, ParseError, PublicKey, Signature};
use parity_scale_codec::Encode;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{short_id, transaction::Transaction};

/// Numeric block id, derived from the canonical bytes.
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
pub struct BlockId(u64);

impl BlockId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for BlockId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for BlockId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|err| ParseError(format!("Invalid block id: {err}")))
    }
}

/// A draft failed schema normalisation.
#[derive(Debug, Clone, Copy, displaydoc::Display, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Failed to normalize block: missing {0}
    MissingField(&'static str),
}

/// Fully-specified block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Derived id; absent until verification computes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    /// Protocol version the block was forged under.
    pub version: u32,
    /// Seconds since the chain epoch; fixes the slot.
    pub timestamp: u64,
    /// Position in the chain, starting at 1 for genesis.
    pub height: u64,
    /// Id of the parent block; absent only at genesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_block: Option<BlockId>,
    /// Number of transactions included.
    pub number_of_transactions: u32,
    /// Sum of all transferred amounts.
    pub total_amount: u64,
    /// Sum of all fees.
    pub total_fee: u64,
    /// Forging reward for this height.
    pub reward: u64,
    /// Byte length of the serialized transaction payload.
    pub payload_length: u32,
    /// Digest over the concatenated canonical transaction bytes.
    pub payload_hash: Hash,
    /// Key of the forging delegate.
    pub generator_public_key: PublicKey,
    /// Delegate signature over the signable bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    /// Included transactions, in consensus order.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Bytes covered by the delegate signature.
    #[must_use]
    pub fn signable_bytes(&self) -> Vec<u8> {
        (
            self.version,
            self.timestamp,
            self.height,
            self.previous_block,
            self.number_of_transactions,
            self.total_amount,
            self.total_fee,
            self.reward,
            self.payload_length,
            self.payload_hash,
            self.generator_public_key,
        )
            .encode()
    }

    /// Canonical bytes: the signable bytes followed by the signature, when
    /// present. This is the form id derivation consumes.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = self.signable_bytes();
        if let Some(signature) = self.signature {
            bytes.extend_from_slice(&signature.to_bytes());
        }
        bytes
    }

    /// Derive the id from the canonical bytes.
    #[must_use]
    pub fn calculate_id(&self) -> BlockId {
        BlockId(short_id(&Hash::new(self.canonical_bytes())))
    }

    /// Check the delegate signature against the generator key.
    ///
    /// An absent signature fails verification.
    #[must_use]
    pub fn verify_signature(&self) -> bool {
        self.signature.is_some_and(|signature| {
            self.generator_public_key
                .verify(&self.signable_bytes(), &signature)
                .is_ok()
        })
    }

    /// Sign with the forging key pair, replacing any existing signature.
    pub fn sign(&mut self, key_pair: &KeyPair) {
        self.signature = Some(key_pair.sign(&self.signable_bytes()));
    }

    /// Assemble and sign a block for a slot.
    ///
    /// Totals, payload digest and payload length are computed from
    /// `transactions`; the id is left for verification to fill.
    ///
    /// # Errors
    /// If any transaction lacks its canonical form.
    pub fn forge(
        key_pair: &KeyPair,
        timestamp: u64,
        height: u64,
        previous_block: Option<BlockId>,
        reward: u64,
        transactions: Vec<Transaction>,
    ) -> Result<Self, crate::transaction::TransactionError> {
        let mut payload = Vec::new();
        let mut total_amount: u64 = 0;
        let mut total_fee: u64 = 0;
        for tx in &transactions {
            payload.extend_from_slice(&tx.canonical_bytes()?);
            total_amount = total_amount.saturating_add(tx.amount);
            total_fee = total_fee.saturating_add(tx.fee);
        }

        let mut block = Self {
            id: None,
            version: 0,
            timestamp,
            height,
            previous_block,
            number_of_transactions: transactions.len() as u32,
            total_amount,
            total_fee,
            reward,
            payload_length: payload.len() as u32,
            payload_hash: Hash::new(&payload),
            generator_public_key: *key_pair.public_key(),
            signature: None,
            transactions,
        };
        block.sign(key_pair);
        Ok(block)
    }

    /// Produce the compact wire form: fields equal to their canonical
    /// default are dropped.
    #[must_use]
    pub fn reduce(&self) -> BlockDraft {
        fn keep<T: PartialEq>(value: T, default: &T) -> Option<T> {
            (value != *default).then_some(value)
        }

        BlockDraft {
            id: self.id,
            version: keep(self.version, &0),
            timestamp: self.timestamp,
            height: self.height,
            previous_block: self.previous_block,
            number_of_transactions: keep(self.number_of_transactions, &0),
            total_amount: keep(self.total_amount, &0),
            total_fee: keep(self.total_fee, &0),
            reward: keep(self.reward, &0),
            payload_length: keep(self.payload_length, &0),
            payload_hash: self.payload_hash,
            generator_public_key: self.generator_public_key,
            signature: self.signature,
            transactions: (!self.transactions.is_empty()).then(|| self.transactions.clone()),
        }
    }
}

/// Partially-specified block, as gossiped or stored compactly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDraft {
    /// Derived id, when already known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    /// Protocol version; canonical default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Seconds since the chain epoch.
    pub timestamp: u64,
    /// Position in the chain.
    pub height: u64,
    /// Id of the parent block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_block: Option<BlockId>,
    /// Number of transactions; canonical default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_transactions: Option<u32>,
    /// Sum of amounts; canonical default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<u64>,
    /// Sum of fees; canonical default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fee: Option<u64>,
    /// Forging reward; canonical default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<u64>,
    /// Payload byte length; canonical default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_length: Option<u32>,
    /// Digest over the transaction payload.
    pub payload_hash: Hash,
    /// Key of the forging delegate.
    pub generator_public_key: PublicKey,
    /// Delegate signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    /// Included transactions; canonical default empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
}

impl BlockDraft {
    /// Fill every absent defaultable field with its canonical default.
    ///
    /// `number_of_transactions` defaults to the length of `transactions`
    /// when those are present. Idempotent.
    #[must_use]
    pub fn add_properties(mut self) -> Self {
        let transaction_count = self.transactions.as_ref().map_or(0, Vec::len) as u32;
        self.version = self.version.or(Some(0));
        self.number_of_transactions = self.number_of_transactions.or(Some(transaction_count));
        self.total_amount = self.total_amount.or(Some(0));
        self.total_fee = self.total_fee.or(Some(0));
        self.reward = self.reward.or(Some(0));
        self.payload_length = self.payload_length.or(Some(0));
        self.transactions = self.transactions.or_else(|| Some(Vec::new()));
        self
    }

    /// Schema normalisation: promote to a fully-specified [`Block`].
    ///
    /// # Errors
    /// If a defaultable field is still absent (the draft skipped
    /// [`Self::add_properties`]) or the block carries no signature.
    pub fn normalize(self) -> Result<Block, NormalizeError> {
        use NormalizeError::MissingField;

        if self.signature.is_none() {
            return Err(MissingField("signature"));
        }

        Ok(Block {
            id: self.id,
            version: self.version.ok_or(MissingField("version"))?,
            timestamp: self.timestamp,
            height: self.height,
            previous_block: self.previous_block,
            number_of_transactions: self
                .number_of_transactions
                .ok_or(MissingField("numberOfTransactions"))?,
            total_amount: self.total_amount.ok_or(MissingField("totalAmount"))?,
            total_fee: self.total_fee.ok_or(MissingField("totalFee"))?,
            reward: self.reward.ok_or(MissingField("reward"))?,
            payload_length: self.payload_length.ok_or(MissingField("payloadLength"))?,
            payload_hash: self.payload_hash,
            generator_public_key: self.generator_public_key,
            signature: self.signature,
            transactions: self.transactions.ok_or(MissingField("transactions"))?,
        })
    }
}

impl From<Block> for BlockDraft {
    fn from(block: Block) -> Self {
        Self {
            id: block.id,
            version: Some(block.version),
            timestamp: block.timestamp,
            height: block.height,
            previous_block: block.previous_block,
            number_of_transactions: Some(block.number_of_transactions),
            total_amount: Some(block.total_amount),
            total_fee: Some(block.total_fee),
            reward: Some(block.reward),
            payload_length: Some(block.payload_length),
            payload_hash: block.payload_hash,
            generator_public_key: block.generator_public_key,
            signature: block.signature,
            transactions: Some(block.transactions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_draft(key_pair: &KeyPair) -> BlockDraft {
        BlockDraft {
            id: None,
            version: None,
            timestamp: 30,
            height: 2,
            previous_block: Some(BlockId(11)),
            number_of_transactions: None,
            total_amount: None,
            total_fee: None,
            reward: None,
            payload_length: None,
            payload_hash: Hash::new(b""),
            generator_public_key: *key_pair.public_key(),
            signature: Some(key_pair.sign(b"placeholder")),
            transactions: None,
        }
    }

    #[test]
    fn add_properties_fills_canonical_defaults() {
        let key_pair = KeyPair::from_passphrase("forger");
        let block = empty_draft(&key_pair).add_properties().normalize().expect("Valid");
        assert_eq!(block.version, 0);
        assert_eq!(block.number_of_transactions, 0);
        assert_eq!(block.total_amount, 0);
        assert_eq!(block.reward, 0);
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn add_properties_is_idempotent() {
        let key_pair = KeyPair::from_passphrase("forger");
        let once = empty_draft(&key_pair).add_properties();
        assert_eq!(once.clone().add_properties(), once);
    }

    #[test]
    fn reduce_inverts_add_properties_on_defaults() {
        let key_pair = KeyPair::from_passphrase("forger");
        let draft = empty_draft(&key_pair);
        let reduced = draft.clone().add_properties().normalize().expect("Valid").reduce();
        assert_eq!(reduced, draft);
    }

    #[test]
    fn normalize_requires_filled_fields() {
        let key_pair = KeyPair::from_passphrase("forger");
        assert_eq!(
            empty_draft(&key_pair).normalize(),
            Err(NormalizeError::MissingField("version"))
        );
    }

    #[test]
    fn normalize_requires_signature() {
        let key_pair = KeyPair::from_passphrase("forger");
        let mut draft = empty_draft(&key_pair).add_properties();
        draft.signature = None;
        assert_eq!(draft.normalize(), Err(NormalizeError::MissingField("signature")));
    }

    #[test]
    fn forged_block_signature_and_id_hold() {
        let key_pair = KeyPair::from_passphrase("forger");
        let mut block = Block::forge(&key_pair, 50, 2, Some(BlockId(9)), 0, Vec::new()).expect("Valid");
        assert!(block.verify_signature());

        let id = block.calculate_id();
        assert_eq!(block.calculate_id(), id);

        // Any field tamper shifts the id and breaks the signature.
        block.reward = 1;
        assert_ne!(block.calculate_id(), id);
        assert!(!block.verify_signature());
    }

    #[test]
    fn forge_computes_payload_totals() {
        let forger = KeyPair::from_passphrase("forger");
        let sender = KeyPair::from_passphrase("sender");
        let mut tx = Transaction {
            id: None,
            timestamp: 41,
            sender_public_key: *sender.public_key(),
            recipient: Some("777".to_owned()),
            amount: 300,
            fee: 20,
            signature: None,
            block_id: None,
        };
        tx.sign(&sender);

        let block = Block::forge(&forger, 60, 3, Some(BlockId(4)), 0, vec![tx.clone()]).expect("Valid");
        assert_eq!(block.number_of_transactions, 1);
        assert_eq!(block.total_amount, 300);
        assert_eq!(block.total_fee, 20);
        let payload = tx.canonical_bytes().expect("Valid");
        assert_eq!(block.payload_length as usize, payload.len());
        assert_eq!(block.payload_hash, Hash::new(payload));
    }

    #[test]
    fn wire_form_round_trips_through_serde() {
        let key_pair = KeyPair::from_passphrase("forger");
        let block = Block::forge(&key_pair, 70, 4, Some(BlockId(2)), 500, Vec::new()).expect("Valid");
        let reduced = block.reduce();
        let json = serde_json::to_string(&reduced).expect("Valid");
        assert!(!json.contains("totalAmount"));
        let back: BlockDraft = serde_json::from_str(&json).expect("Valid");
        assert_eq!(back, reduced);
    }
}
