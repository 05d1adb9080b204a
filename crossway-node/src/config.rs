use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crossway_common::CrosswayError;
use crossway_consensus::{QuorumPolicy, RoundConfig};

use crate::Result;

/// How many vehicles each round draws from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Uniform in `1..=line_count * 4`.
    #[default]
    Random,
    /// Always `line_count * 4`.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// One gRPC server per vehicle on loopback.
    #[default]
    Grpc,
    /// Peers called in-process.
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub total_vehicles: usize,
    pub byzantine_ratio: f64,
    pub line_count: usize,
    pub vision_time_ms: u64,
    pub manual_arbitration_ms: u64,
    pub byzantine_release_ms: u64,
    pub max_jitter_ms: u64,
    pub rpc_timeout_ms: u64,
    pub base_port: u16,
    pub sample_mode: SampleMode,
    pub quorum_policy: QuorumPolicy,
    pub transport: TransportKind,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_vehicles: 300,
            byzantine_ratio: 0.1,
            line_count: 4,
            vision_time_ms: 500,
            manual_arbitration_ms: 3000,
            byzantine_release_ms: 3000,
            max_jitter_ms: 50,
            rpc_timeout_ms: 2000,
            base_port: 50051,
            sample_mode: SampleMode::Random,
            quorum_policy: QuorumPolicy::Majority,
            transport: TransportKind::Grpc,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.byzantine_ratio) {
            return Err(CrosswayError::Config(format!(
                "byzantine_ratio must be within [0, 1], got {}",
                self.byzantine_ratio
            )));
        }
        if self.line_count == 0 {
            return Err(CrosswayError::Config("line_count must be at least 1".into()));
        }
        if usize::from(self.base_port) + self.total_vehicles > usize::from(u16::MAX) {
            return Err(CrosswayError::Config(format!(
                "base_port {} leaves no room for {} vehicles",
                self.base_port, self.total_vehicles
            )));
        }
        Ok(())
    }

    /// Number of Byzantine vehicles in the pool, rounded down.
    pub fn byzantine_count(&self) -> usize {
        (self.total_vehicles as f64 * self.byzantine_ratio).floor() as usize
    }

    /// Largest number of vehicles a single round may hold.
    pub fn max_round_size(&self) -> usize {
        self.line_count * 4
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            vision_time: Duration::from_millis(self.vision_time_ms),
            manual_arbitration_delay: Duration::from_millis(self.manual_arbitration_ms),
            byzantine_release_delay: Duration::from_millis(self.byzantine_release_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
            quorum_policy: self.quorum_policy,
            ..RoundConfig::default()
        }
    }
}

/// Writes a default config at `path` if there is none yet, then loads it.
pub fn ensure_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("⚠️ No config at {}, writing defaults", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        SimulationConfig::default().save_to_file(path)?;
    }
    SimulationConfig::load_from_file(path)
}
