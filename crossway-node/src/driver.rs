use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crossway_common::utils::{sample::select_random, sets::difference};
use crossway_consensus::{GrpcNetwork, InMemoryNetwork, PeerNetwork, RoundOrchestrator};

use crate::config::{SampleMode, SimulationConfig, TransportKind};
use crate::report::SimulationReport;

/// Splits the vehicle pool into rounds and runs them one after another.
pub struct SimulationDriver {
    config: SimulationConfig,
    orchestrator: RoundOrchestrator,
    rng: StdRng,
    shutdown: CancellationToken,
}

impl SimulationDriver {
    pub fn new(config: SimulationConfig, network: Arc<dyn PeerNetwork>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let shutdown = CancellationToken::new();
        let orchestrator =
            RoundOrchestrator::new(network, config.round_config()).with_shutdown(shutdown.clone());
        Self {
            config,
            orchestrator,
            rng,
            shutdown,
        }
    }

    /// Builds the transport named in the config.
    pub fn from_config(config: SimulationConfig) -> Self {
        let network: Arc<dyn PeerNetwork> = match config.transport {
            TransportKind::Grpc => Arc::new(GrpcNetwork::with_timeout(config.base_port, config.rpc_timeout())),
            TransportKind::InMemory => Arc::new(InMemoryNetwork::new(config.base_port)),
        };
        Self::new(config, network)
    }

    /// Cancelling this token stops the run after the current pass.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn round_size(&mut self, remaining: usize) -> usize {
        let max = self.config.max_round_size().max(1);
        let size = match self.config.sample_mode {
            SampleMode::Random => self.rng.gen_range(1..=max),
            SampleMode::Fixed => max,
        };
        size.min(remaining)
    }

    pub async fn run(&mut self) -> SimulationReport {
        let started = Instant::now();
        let mut pool: Vec<i32> = (1..=self.config.total_vehicles as i32).collect();
        let byzantine: HashSet<i32> =
            select_random(&pool, self.config.byzantine_count(), &mut self.rng)
                .into_iter()
                .collect();

        info!(
            "🚦 Simulation: {} vehicles, {} byzantine, up to {} per round",
            pool.len(),
            byzantine.len(),
            self.config.max_round_size()
        );

        let mut report = SimulationReport {
            vehicles: pool.len(),
            byzantine: byzantine.len(),
            vision_time_ms: self.config.vision_time_ms,
            ..Default::default()
        };

        while !pool.is_empty() {
            if self.shutdown.is_cancelled() {
                warn!("Simulation stopped with {} vehicles still waiting", pool.len());
                break;
            }

            let size = self.round_size(pool.len());
            let selected = select_random(&pool, size, &mut self.rng);
            let round = self.orchestrator.run_round(&selected, &byzantine).await;
            info!(
                "Round {} done: {}/{} crossed, fallback={}, {:?}",
                report.rounds + 1,
                round.passed,
                round.vehicles,
                round.fallback_triggered,
                round.elapsed
            );
            report.record(&round);
            pool = difference(&pool, &selected);
        }

        report.elapsed = started.elapsed();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory(total: usize, seed: u64) -> SimulationConfig {
        SimulationConfig {
            total_vehicles: total,
            transport: TransportKind::InMemory,
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_round_size_respects_mode_and_pool() {
        let mut driver = SimulationDriver::from_config(in_memory(10, 1));
        for _ in 0..50 {
            let size = driver.round_size(100);
            assert!((1..=16).contains(&size));
        }
        assert!(driver.round_size(3) <= 3);

        let mut fixed = SimulationDriver::from_config(SimulationConfig {
            sample_mode: SampleMode::Fixed,
            line_count: 2,
            ..in_memory(10, 1)
        });
        assert_eq!(fixed.round_size(100), 8);
        assert_eq!(fixed.round_size(5), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_vehicle_crosses() {
        let mut driver = SimulationDriver::from_config(in_memory(40, 7));
        let report = driver.run().await;

        assert_eq!(report.vehicles, 40);
        assert_eq!(report.byzantine, 4);
        assert_eq!(report.passed, 40);
        assert!(report.rounds >= 3);
        assert!(report.fallback_percentage().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pool_runs_no_rounds() {
        let mut driver = SimulationDriver::from_config(in_memory(0, 1));
        let report = driver.run().await;
        assert_eq!(report.rounds, 0);
        assert_eq!(report.fallback_percentage(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_between_rounds() {
        let mut driver = SimulationDriver::from_config(in_memory(20, 3));
        driver.shutdown_token().cancel();
        let report = driver.run().await;
        assert_eq!(report.rounds, 0);
        assert_eq!(report.passed, 0);
    }
}
