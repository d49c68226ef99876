//! The reward schedule: a milestone table mapping heights to forging
//! rewards. Part of the consensus contract.

use arkona_config::chain;

/// Forging reward as a function of block height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSchedule {
    offset: u64,
    distance: u64,
    milestones: Vec<u64>,
}

impl RewardSchedule {
    /// Build from explicit constants.
    ///
    /// `distance` and `milestones` must be non-empty and non-zero.
    #[must_use]
    pub fn new(offset: u64, distance: u64, milestones: Vec<u64>) -> Self {
        assert!(distance > 0, "Reward distance must be positive");
        assert!(!milestones.is_empty(), "Reward milestones must not be empty");
        Self {
            offset,
            distance,
            milestones,
        }
    }

    /// Build from the chain configuration.
    #[must_use]
    pub fn from_configuration(configuration: &chain::Configuration) -> Self {
        Self::new(
            configuration.reward_offset,
            configuration.reward_distance,
            configuration.reward_milestones.clone(),
        )
    }

    /// Index of the milestone active at `height`.
    #[must_use]
    pub fn milestone_at(&self, height: u64) -> usize {
        if height < self.offset {
            return 0;
        }
        let passed = (height - self.offset) / self.distance;
        (passed as usize).min(self.milestones.len() - 1)
    }

    /// Expected reward for a block at `height`.
    ///
    /// Genesis carries no reward, and neither does any height before the
    /// reward offset.
    #[must_use]
    pub fn reward_at(&self, height: u64) -> u64 {
        if height <= 1 || height < self.offset {
            return 0;
        }
        self.milestones[self.milestone_at(height)]
    }

    /// Total rewards minted up to and including `height`.
    #[must_use]
    pub fn supply_at(&self, height: u64) -> u64 {
        if height < self.offset {
            return 0;
        }

        let mut supply: u64 = 0;
        let mut from = self.offset;
        for (index, &milestone) in self.milestones.iter().enumerate() {
            let until = if index + 1 == self.milestones.len() {
                height
            } else {
                (from + self.distance - 1).min(height)
            };
            if from > height {
                break;
            }
            supply = supply.saturating_add((until - from + 1).saturating_mul(milestone));
            from = until + 1;
        }
        supply
    }
}
