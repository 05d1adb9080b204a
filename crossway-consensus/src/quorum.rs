use serde::{Deserialize, Serialize};

/// Rule deciding how many acknowledgments a round of `T` vehicles needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumPolicy {
    /// Simple majority: `T / 2 + 1`.
    #[default]
    Majority,
    /// Every vehicle of the round: `T`.
    Unanimous,
}

impl QuorumPolicy {
    /// Quorum size for `total` active vehicles.
    pub fn required(self, total: u32) -> u32 {
        match self {
            QuorumPolicy::Majority => total / 2 + 1,
            QuorumPolicy::Unanimous => total,
        }
    }

    /// Acknowledgments a candidate must collect from the others, i.e. the
    /// quorum minus its own implicit vote.
    pub fn threshold(self, total: u32) -> u32 {
        self.required(total).saturating_sub(1)
    }
}
