//! Chain-level protocol constants. Every value here is part of the consensus
//! contract: a node that diverges on any of them forks the network.

use serde::{Deserialize, Serialize};

/// Unix timestamp of slot zero.
pub const DEFAULT_EPOCH_TIME: u64 = 1_577_836_800;
/// Seconds per block slot.
pub const DEFAULT_SLOT_INTERVAL: u64 = 10;
/// Number of recent slots within which a block is still acceptable on
/// receipt; also the capacity of the recent-id window.
pub const DEFAULT_BLOCK_SLOT_WINDOW: u64 = 5;
/// Upper bound on the serialized transaction payload of one block.
pub const DEFAULT_MAX_PAYLOAD_LENGTH: u32 = 1024 * 1024;
/// Upper bound on the number of transactions in one block.
pub const DEFAULT_MAX_TRANSACTIONS_PER_BLOCK: u32 = 25;
/// Number of delegate slots per round.
pub const DEFAULT_ACTIVE_DELEGATES: u64 = 101;
/// Height at which block rewards start.
pub const DEFAULT_REWARD_OFFSET: u64 = 259_200;
/// Number of blocks between reward milestones.
pub const DEFAULT_REWARD_DISTANCE: u64 = 3_000_000;
/// Reward per block at each milestone, in base units.
pub const DEFAULT_REWARD_MILESTONES: [u64; 5] =
    [500_000_000, 400_000_000, 300_000_000, 200_000_000, 100_000_000];

/// Consensus constants of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Configuration {
    /// Unix timestamp of slot zero.
    pub epoch_time: u64,
    /// Seconds per block slot.
    pub slot_interval: u64,
    /// Receipt-time slot tolerance and recent-id window capacity.
    pub block_slot_window: u64,
    /// Upper bound on the serialized transaction payload of one block.
    pub max_payload_length: u32,
    /// Upper bound on the number of transactions in one block.
    pub max_transactions_per_block: u32,
    /// Number of delegate slots per round.
    pub active_delegates: u64,
    /// Height at which block rewards start.
    pub reward_offset: u64,
    /// Number of blocks between reward milestones.
    pub reward_distance: u64,
    /// Reward per block at each milestone, in base units.
    pub reward_milestones: Vec<u64>,
    /// Ids of historic blocks exempt from the reward check.
    pub reward_exceptions: Vec<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            epoch_time: DEFAULT_EPOCH_TIME,
            slot_interval: DEFAULT_SLOT_INTERVAL,
            block_slot_window: DEFAULT_BLOCK_SLOT_WINDOW,
            max_payload_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            max_transactions_per_block: DEFAULT_MAX_TRANSACTIONS_PER_BLOCK,
            active_delegates: DEFAULT_ACTIVE_DELEGATES,
            reward_offset: DEFAULT_REWARD_OFFSET,
            reward_distance: DEFAULT_REWARD_DISTANCE,
            reward_milestones: DEFAULT_REWARD_MILESTONES.to_vec(),
            reward_exceptions: Vec::new(),
        }
    }
}
