use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// What happened during one call to `RoundOrchestrator::run_round`.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub round_id: Uuid,
    pub vehicles: usize,
    /// Crossings counted, one per vehicle removed from the active set.
    pub passed: usize,
    /// Elected leaders, in order.
    pub leaders: Vec<i32>,
    /// The vision system had to clear the intersection at least once.
    pub fallback_triggered: bool,
    /// Vehicles the vision system cleared, in order. Never Byzantine.
    pub fallback_cleared: Vec<i32>,
    pub passes: usize,
    pub byzantine_released: usize,
    pub elapsed: Duration,
}
