//! Level progression.
//!
//! Level 0 is the hub. Finish points in the hub lead to the level named by
//! their exit id once the player presses enter. Any finish point outside the
//! hub advances to the next level, wrapping from the last level back to 1.
//! Returning to the hub remembers the level that was left so play can resume
//! there.

/// Index of the hub level.
pub const HUB_LEVEL: usize = 0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CampaignError {
    #[error("A campaign needs at least one level")]
    Empty,
    #[error("Level {index} does not exist, campaign has {count} levels")]
    UnknownLevel { index: usize, count: usize },
}

/// Which level is being played and where its exits lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Campaign {
    current: usize,
    /// Last non-hub level played.
    natural_level: usize,
    level_count: usize,
}

impl Campaign {
    /// Starts a campaign in the hub.
    pub fn new(level_count: usize) -> Result<Self, CampaignError> {
        if level_count == 0 {
            return Err(CampaignError::Empty);
        }
        Ok(Self {
            current: HUB_LEVEL,
            natural_level: (level_count - 1).min(1),
            level_count,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn natural_level(&self) -> usize {
        self.natural_level
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub fn is_hub(&self) -> bool {
        self.current == HUB_LEVEL
    }

    /// Level the player would move to this frame, if any.
    ///
    /// `at_exit` is the exit id of the finish point the player stands in.
    pub fn next_level(&self, at_exit: Option<u32>, enter: bool) -> Option<usize> {
        let exit = at_exit?;
        if self.is_hub() {
            if !enter {
                return None;
            }
            let target = usize::try_from(exit).ok()?;
            if target == HUB_LEVEL || target >= self.level_count {
                tracing::warn!("[campaign] Hub exit {} leads nowhere", exit);
                return None;
            }
            return Some(target);
        }

        if self.level_count <= 1 {
            return None;
        }
        let next = self.current + 1;
        Some(if next >= self.level_count { 1 } else { next })
    }

    /// Moves to `index`.
    pub fn advance_to(&mut self, index: usize) -> Result<(), CampaignError> {
        if index >= self.level_count {
            return Err(CampaignError::UnknownLevel {
                index,
                count: self.level_count,
            });
        }
        tracing::info!("[campaign] Level {} -> {}", self.current, index);
        self.current = index;
        if index != HUB_LEVEL {
            self.natural_level = index;
        }
        Ok(())
    }

    /// Switches to the hub and returns its index.
    pub fn enter_hub(&mut self) -> usize {
        if !self.is_hub() {
            tracing::info!("[campaign] Back to hub from level {}", self.current);
            self.natural_level = self.current;
        }
        self.current = HUB_LEVEL;
        HUB_LEVEL
    }
}
