use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crossway_consensus::RoundReport;

/// Totals over a whole simulation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    pub vehicles: usize,
    pub byzantine: usize,
    pub rounds: usize,
    /// Rounds in which the vision system had to step in.
    pub fallback_rounds: usize,
    pub passed: usize,
    pub leaders: usize,
    pub vision_time_ms: u64,
    pub elapsed: Duration,
}

impl SimulationReport {
    pub fn record(&mut self, round: &RoundReport) {
        self.rounds += 1;
        self.passed += round.passed;
        self.leaders += round.leaders.len();
        if round.fallback_triggered {
            self.fallback_rounds += 1;
        }
    }

    /// Integer share of rounds that fell back, `None` before the first round.
    pub fn fallback_percentage(&self) -> Option<u64> {
        if self.rounds == 0 {
            return None;
        }
        Some((self.fallback_rounds * 100 / self.rounds) as u64)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total consensus duration: {:?}", self.elapsed)?;
        writeln!(f, "Number of consensus rounds: {}", self.rounds)?;
        writeln!(f, "Rounds exceeding {} ms: {}", self.vision_time_ms, self.fallback_rounds)?;
        match self.fallback_percentage() {
            Some(pct) => write!(f, "Vision-system consensus percentage: {}%", pct),
            None => write!(f, "Vision-system consensus percentage: n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn round(passed: usize, fallback: bool) -> RoundReport {
        RoundReport {
            round_id: Uuid::new_v4(),
            vehicles: passed,
            passed,
            leaders: vec![1],
            fallback_triggered: fallback,
            fallback_cleared: Vec::new(),
            passes: 1,
            byzantine_released: 0,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_percentage_guarded_for_no_rounds() {
        let report = SimulationReport::default();
        assert_eq!(report.fallback_percentage(), None);
        assert!(report.to_string().ends_with("n/a"));
    }

    #[test]
    fn test_percentage_is_integer_division() {
        let mut report = SimulationReport::default();
        report.record(&round(3, true));
        report.record(&round(2, false));
        report.record(&round(4, false));

        assert_eq!(report.rounds, 3);
        assert_eq!(report.fallback_rounds, 1);
        assert_eq!(report.passed, 9);
        assert_eq!(report.fallback_percentage(), Some(33));
    }

    #[test]
    fn test_summary_lines() {
        let mut report = SimulationReport {
            vision_time_ms: 500,
            ..Default::default()
        };
        report.record(&round(1, true));
        let text = report.to_string();
        assert!(text.contains("Number of consensus rounds: 1"));
        assert!(text.contains("Rounds exceeding 500 ms: 1"));
        assert!(text.contains("percentage: 100%"));
    }
}
