//! Consensus predicates for candidate blocks.
//!
//! Two entry points share one predicate set: [`BlockVerifier::verify_receipt`]
//! runs at receipt time (gossip) and adds the anti-replay guards, while
//! [`BlockVerifier::verify_block`] runs inside the processing pipeline and
//! adds fork-one classification and strict slot ordering.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use arkona_config::chain;
use arkona_crypto::Hash;
use arkona_data_model::prelude::*;
use parking_lot::Mutex;

use crate::{
    modules::{BlockStore, DelegateLedger, ForkCause},
    rewards::RewardSchedule,
    slots::Slots,
};

/// Why a candidate block was rejected.
///
/// The display strings are observed by peers and operators alike and are
/// part of the node's compatibility surface; do not reword them casually.
#[derive(Debug, Clone, Copy, displaydoc::Display, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    /// Failed to verify block signature
    Signature,
    /// Invalid previous block
    MissingPreviousBlock,
    /// Block already exists in chain
    AlreadyInChain,
    /// Block slot is too old
    SlotTooOld,
    /// Block slot is in the future
    SlotInFuture,
    /// Invalid block version
    Version,
    /// Invalid block reward: {got} expected: {want}
    Reward {
        /// Reward claimed by the block.
        got: u64,
        /// Reward the schedule demands at this height.
        want: u64,
    },
    /// Invalid previous block: {got} expected: {want}
    PreviousBlockMismatch {
        /// Parent id named by the block.
        got: BlockId,
        /// Id of the chain tip.
        want: BlockId,
    },
    /// Invalid block timestamp
    Timestamp,
    /// Payload length is too high
    PayloadLengthTooHigh,
    /// Included transactions do not match block transactions count
    TransactionCountMismatch,
    /// Number of transactions exceeds maximum per block
    TooManyTransactions,
    /// {0}
    TransactionCodec(TransactionError),
    /// Encountered duplicate transaction: {0}
    DuplicateTransaction(TransactionId),
    /// Invalid payload hash
    PayloadHash,
    /// Invalid total amount
    TotalAmount,
    /// Invalid total fee
    TotalFee,
}

/// Outcome of running the verification predicates over one block.
///
/// `verified` holds exactly when `errors` is empty. The error list is
/// reversed before being returned, so the earliest-detected error appears
/// last; callers surface `errors[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Whether every predicate passed.
    pub verified: bool,
    /// Accumulated rejections, reversed.
    pub errors: Vec<RejectionReason>,
}

impl Receipt {
    fn new(mut errors: Vec<RejectionReason>) -> Self {
        errors.reverse();
        Self {
            verified: errors.is_empty(),
            errors,
        }
    }

    /// The error a caller surfaces: the head of the reversed list.
    #[must_use]
    pub fn first_error(&self) -> Option<&RejectionReason> {
        self.errors.first()
    }

    /// Collapse into a result, surfacing `errors[0]` on failure.
    ///
    /// # Errors
    /// The head of the reversed error list, when verification failed.
    pub fn into_result(mut self) -> Result<(), RejectionReason> {
        if self.verified {
            Ok(())
        } else {
            Err(self.errors.swap_remove(0))
        }
    }
}

/// Bounded FIFO of the ids of recently accepted blocks, most recent last.
#[derive(Debug)]
pub struct RecentBlockIds {
    ids: VecDeque<BlockId>,
    capacity: usize,
}

impl RecentBlockIds {
    /// Empty window with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an id, evicting the oldest beyond capacity.
    pub fn push(&mut self, id: BlockId) {
        self.ids.push_back(id);
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    /// Whether the window holds this id.
    #[must_use]
    pub fn contains(&self, id: BlockId) -> bool {
        self.ids.contains(&id)
    }

    /// Replace the contents with the trailing `capacity` ids of `ids`.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = BlockId>) {
        self.ids.clear();
        for id in ids {
            self.push(id);
        }
    }

    /// Number of ids currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Stateless-per-call verifier over candidate blocks.
///
/// Holds the consensus constants and the collaborators the predicates
/// consult; all per-block state lives in the receipt.
pub struct BlockVerifier {
    slots: Slots,
    rewards: RewardSchedule,
    block_slot_window: u64,
    max_payload_length: u32,
    max_transactions_per_block: u32,
    reward_exceptions: HashSet<BlockId>,
    store: Arc<dyn BlockStore>,
    delegates: Arc<dyn DelegateLedger>,
    recent_ids: Arc<Mutex<RecentBlockIds>>,
}

impl BlockVerifier {
    /// Build a verifier over the given constants and collaborators.
    #[must_use]
    pub fn new(
        configuration: &chain::Configuration,
        store: Arc<dyn BlockStore>,
        delegates: Arc<dyn DelegateLedger>,
        recent_ids: Arc<Mutex<RecentBlockIds>>,
    ) -> Self {
        Self {
            slots: Slots::from_configuration(configuration),
            rewards: RewardSchedule::from_configuration(configuration),
            block_slot_window: configuration.block_slot_window,
            max_payload_length: configuration.max_payload_length,
            max_transactions_per_block: configuration.max_transactions_per_block,
            reward_exceptions: configuration
                .reward_exceptions
                .iter()
                .copied()
                .map(BlockId::from)
                .collect(),
            store,
            delegates,
            recent_ids,
        }
    }

    /// Verify a block at receipt time, against the current chain tip.
    ///
    /// Sets `block.height` to `tip.height + 1` and fills `block.id` as a
    /// side effect.
    pub fn verify_receipt(&self, block: &mut Block) -> Receipt {
        let last_block = self.store.last_block();
        block.height = last_block.height + 1;

        let mut errors = Vec::new();
        Self::check_signature(block, &mut errors);
        Self::check_previous_block(block, &mut errors);
        self.check_recent_ids(block, &mut errors);
        self.check_slot_window(block, &mut errors);
        Self::check_version(block, &mut errors);
        self.check_reward(block, &mut errors);
        Self::check_id(block);
        self.check_payload(block, &mut errors);

        Receipt::new(errors)
    }

    /// Verify a block inside the processing pipeline.
    ///
    /// Omits the receipt-time anti-replay guards and adds fork-one
    /// classification plus strict slot ordering against the chain tip.
    pub fn verify_block(&self, block: &mut Block) -> Receipt {
        let last_block = self.store.last_block();
        block.height = last_block.height + 1;

        let mut errors = Vec::new();
        Self::check_signature(block, &mut errors);
        Self::check_previous_block(block, &mut errors);
        Self::check_version(block, &mut errors);
        self.check_reward(block, &mut errors);
        Self::check_id(block);
        self.check_payload(block, &mut errors);
        self.check_fork_one(block, &last_block, &mut errors);
        self.check_block_slot(block, &last_block, &mut errors);

        Receipt::new(errors)
    }

    fn check_signature(block: &Block, errors: &mut Vec<RejectionReason>) {
        if !block.verify_signature() {
            errors.push(RejectionReason::Signature);
        }
    }

    fn check_previous_block(block: &Block, errors: &mut Vec<RejectionReason>) {
        if block.previous_block.is_none() && block.height != 1 {
            errors.push(RejectionReason::MissingPreviousBlock);
        }
    }

    // The claimed id is checked; the recomputed one lands in `check_id`.
    fn check_recent_ids(&self, block: &Block, errors: &mut Vec<RejectionReason>) {
        if let Some(id) = block.id {
            if self.recent_ids.lock().contains(id) {
                errors.push(RejectionReason::AlreadyInChain);
            }
        }
    }

    fn check_slot_window(&self, block: &Block, errors: &mut Vec<RejectionReason>) {
        let slot = self.slots.slot_of(block.timestamp);
        let current = self.slots.current_slot();
        if current > slot + self.block_slot_window {
            errors.push(RejectionReason::SlotTooOld);
        }
        if current < slot {
            errors.push(RejectionReason::SlotInFuture);
        }
    }

    fn check_version(block: &Block, errors: &mut Vec<RejectionReason>) {
        if block.version > 0 {
            errors.push(RejectionReason::Version);
        }
    }

    fn check_reward(&self, block: &Block, errors: &mut Vec<RejectionReason>) {
        let want = self.rewards.reward_at(block.height);
        let exempt = block.id.is_some_and(|id| self.reward_exceptions.contains(&id));
        if block.height != 1 && block.reward != want && !exempt {
            errors.push(RejectionReason::Reward {
                got: block.reward,
                want,
            });
        }
    }

    // Id derivation is total over typed blocks, so unlike the other
    // predicates this one can only assign, never reject.
    fn check_id(block: &mut Block) {
        block.id = Some(block.calculate_id());
    }

    fn check_payload(&self, block: &Block, errors: &mut Vec<RejectionReason>) {
        if block.payload_length > self.max_payload_length {
            errors.push(RejectionReason::PayloadLengthTooHigh);
        }
        if block.transactions.len() != block.number_of_transactions as usize {
            errors.push(RejectionReason::TransactionCountMismatch);
        }
        if block.transactions.len() > self.max_transactions_per_block as usize {
            errors.push(RejectionReason::TooManyTransactions);
        }

        let mut payload = Vec::new();
        let mut seen = HashSet::new();
        let mut total_amount: u64 = 0;
        let mut total_fee: u64 = 0;

        for transaction in &block.transactions {
            match transaction.canonical_bytes() {
                Ok(bytes) => {
                    if let Some(id) = transaction.id.or_else(|| transaction.calculate_id().ok()) {
                        if !seen.insert(id) {
                            errors.push(RejectionReason::DuplicateTransaction(id));
                        }
                    }
                    payload.extend_from_slice(&bytes);
                }
                Err(err) => errors.push(RejectionReason::TransactionCodec(err)),
            }
            total_amount = total_amount.saturating_add(transaction.amount);
            total_fee = total_fee.saturating_add(transaction.fee);
        }

        if Hash::new(&payload) != block.payload_hash {
            errors.push(RejectionReason::PayloadHash);
        }
        if total_amount != block.total_amount {
            errors.push(RejectionReason::TotalAmount);
        }
        if total_fee != block.total_fee {
            errors.push(RejectionReason::TotalFee);
        }
    }

    fn check_fork_one(&self, block: &Block, last_block: &Block, errors: &mut Vec<RejectionReason>) {
        let Some(got) = block.previous_block else {
            return;
        };
        let want = last_block.id.unwrap_or_else(|| last_block.calculate_id());
        if got != want {
            self.delegates.fork(block, ForkCause::PreviousBlockMismatch);
            errors.push(RejectionReason::PreviousBlockMismatch { got, want });
        }
    }

    fn check_block_slot(&self, block: &Block, last_block: &Block, errors: &mut Vec<RejectionReason>) {
        let slot = self.slots.slot_of(block.timestamp);
        let last_slot = self.slots.slot_of(last_block.timestamp);
        if slot > self.slots.current_slot() || slot <= last_slot {
            errors.push(RejectionReason::Timestamp);
        }
    }
}
