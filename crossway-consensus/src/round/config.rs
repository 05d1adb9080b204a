use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use crossway_common::Direction;

use crate::quorum::QuorumPolicy;

/// How each vehicle gets its path at the start of a pass.
#[derive(Debug, Clone, Default)]
pub enum DirectionSource {
    /// Uniform over the twelve paths, redrawn every pass.
    #[default]
    Random,
    /// Same path every pass. Vehicles missing from the map fall back to random.
    Fixed(HashMap<i32, Direction>),
}

impl DirectionSource {
    pub fn assign<R: Rng + ?Sized>(&self, vehicle: i32, rng: &mut R) -> Direction {
        match self {
            DirectionSource::Random => Direction::random(rng),
            DirectionSource::Fixed(map) => match map.get(&vehicle) {
                Some(direction) => *direction,
                None => Direction::random(rng),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundConfig {
    /// Budget the vision system grants a round before it takes over.
    pub vision_time: Duration,
    /// Wait when a pair cannot see each other and must be arbitrated by hand.
    pub manual_arbitration_delay: Duration,
    /// Wait after any Byzantine vehicle drives off on its own.
    pub byzantine_release_delay: Duration,
    /// Upper bound (exclusive) of the random delay before each vote.
    pub max_jitter: Duration,
    pub quorum_policy: QuorumPolicy,
    pub directions: DirectionSource,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            vision_time: Duration::from_millis(500),
            manual_arbitration_delay: Duration::from_millis(3000),
            byzantine_release_delay: Duration::from_millis(3000),
            max_jitter: Duration::from_millis(50),
            quorum_policy: QuorumPolicy::Majority,
            directions: DirectionSource::Random,
        }
    }
}

impl RoundConfig {
    pub fn with_vision_time(mut self, vision_time: Duration) -> Self {
        self.vision_time = vision_time;
        self
    }

    pub fn with_directions(mut self, directions: DirectionSource) -> Self {
        self.directions = directions;
        self
    }

    pub fn with_quorum_policy(mut self, policy: QuorumPolicy) -> Self {
        self.quorum_policy = policy;
        self
    }

    /// Random delay drawn from `0..max_jitter`.
    pub fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let bound = self.max_jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.gen_range(0..bound))
    }
}
