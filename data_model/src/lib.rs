//! Data model of the Arkona ledger: blocks, transactions, accounts and the
//! canonical byte forms that consensus hashes and signs.

pub mod account;
pub mod block;
pub mod transaction;

use arkona_crypto::Hash;

/// Derive the short numeric id of an entity from the digest of its
/// canonical bytes: the first eight digest bytes, little-endian.
pub(crate) fn short_id(hash: &Hash) -> u64 {
    let bytes: [u8; 8] = hash.as_ref()[..8]
        .try_into()
        .expect("INTERNAL BUG: digest is at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Commonly used entities, re-exported.
pub mod prelude {
    pub use crate::{
        account::Account,
        block::{Block, BlockDraft, BlockId, NormalizeError},
        transaction::{Transaction, TransactionError, TransactionId},
    };
}
