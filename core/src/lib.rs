//! Arkona core: the block verification and processing pipeline.
//!
//! A candidate block — freshly forged, gossiped from a peer, or replayed
//! from storage — enters [`process::BlockPipeline`], which normalises it,
//! runs the consensus predicates of [`verify::BlockVerifier`], classifies
//! fork causes, checks every transaction in block order and finally hands
//! the block to the chain-application collaborator.

pub mod forging;
pub mod modules;
pub mod process;
pub mod rewards;
pub mod slots;
pub mod verify;

/// Commonly used core entities, re-exported.
pub mod prelude {
    pub use crate::{
        forging::{load_delegates, ForgingError, KeypairRegistry},
        modules::{
            AccountLedger, BlockStore, ChainApplication, DelegateLedger, ForkCause,
            TransactionPool,
        },
        process::{BlockPipeline, ProcessError},
        rewards::RewardSchedule,
        slots::Slots,
        verify::{BlockVerifier, Receipt, RecentBlockIds, RejectionReason},
    };
}
