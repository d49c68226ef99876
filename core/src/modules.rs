//! Contracts of the neighbouring subsystems the core collaborates with.
//!
//! The pipeline owns no persistent state; everything it needs from the
//! outside world enters through these traits at construction time.

use arkona_crypto::PublicKey;
use arkona_data_model::prelude::*;
use async_trait::async_trait;
use eyre::Result;

/// Classified consensus violations reported to the delegate subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkCause {
    /// The candidate names a parent other than the chain tip.
    PreviousBlockMismatch,
    /// The candidate includes a transaction that is already confirmed.
    DuplicateConfirmedTransaction,
    /// The candidate was forged by a delegate not owning its slot.
    WrongSlotDelegate,
}

impl ForkCause {
    /// Wire code of the cause, as recorded by the delegate subsystem.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::PreviousBlockMismatch => 1,
            Self::DuplicateConfirmedTransaction => 2,
            Self::WrongSlotDelegate => 3,
        }
    }
}

/// Persistent block storage.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Synchronous snapshot of the chain tip.
    fn last_block(&self) -> Block;

    /// Whether the node is shutting down.
    fn is_cleaning(&self) -> bool;

    /// Whether a block with this id is already persisted.
    async fn block_exists(&self, id: BlockId) -> Result<bool>;

    /// Ids of the most recent `n` persisted blocks, most recent last.
    async fn load_last_block_ids(&self, n: usize) -> Result<Vec<BlockId>>;
}

/// The chain-application stage that persists accepted blocks.
#[async_trait]
pub trait ChainApplication: Send + Sync {
    /// Apply an accepted block, mutating persistent state and advancing
    /// the chain tip. `save_block` controls whether the block is written
    /// to storage or only applied to state (replay).
    async fn apply_block(&self, block: &Block, save_block: bool) -> Result<()>;

    /// Relay the compact form of a just-accepted block to peers.
    fn broadcast_reduced_block(&self, block: BlockDraft, broadcast: bool);
}

/// The delegate subsystem: fork accounting and slot ownership.
#[async_trait]
pub trait DelegateLedger: Send + Sync {
    /// Record a classified consensus violation.
    fn fork(&self, block: &Block, cause: ForkCause);

    /// Check that the block's slot belongs to its generator key.
    async fn validate_block_slot(&self, block: &Block) -> Result<()>;
}

/// Account state lookups.
#[async_trait]
pub trait AccountLedger: Send + Sync {
    /// Account materialised for this public key, if any.
    async fn account_by_public_key(&self, public_key: PublicKey) -> Result<Option<Account>>;
}

/// The unconfirmed transaction pool and confirmed-transaction index.
#[async_trait]
pub trait TransactionPool: Send + Sync {
    /// Errors if the transaction is already confirmed on chain.
    async fn check_confirmed(&self, transaction: &Transaction) -> Result<()>;

    /// Roll back the unconfirmed effects of a transaction.
    async fn undo_unconfirmed(&self, transaction: &Transaction) -> Result<()>;

    /// Drop a transaction from the unconfirmed pool.
    fn remove_unconfirmed(&self, id: TransactionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_causes_keep_their_wire_codes() {
        assert_eq!(ForkCause::PreviousBlockMismatch.code(), 1);
        assert_eq!(ForkCause::DuplicateConfirmedTransaction.code(), 2);
        assert_eq!(ForkCause::WrongSlotDelegate.code(), 3);
    }
}
