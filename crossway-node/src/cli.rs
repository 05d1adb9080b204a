use std::path::PathBuf;

use clap::Parser;

use crate::config::{SimulationConfig, TransportKind};

#[derive(Parser, Debug)]
#[command(name = "crossway")]
#[command(about = "Intersection right-of-way consensus simulator")]
pub struct Args {
    /// Simulation config file, created with defaults when missing
    #[arg(long, value_name = "PATH", default_value = "config.json")]
    pub config: PathBuf,

    /// Vehicles in the pool
    #[arg(long, value_name = "N")]
    pub vehicles: Option<usize>,

    /// Share of the pool that is Byzantine, in [0, 1]
    #[arg(long, value_name = "F")]
    pub byzantine_ratio: Option<f64>,

    /// Lanes per approach; a round holds up to four times this many vehicles
    #[arg(long, value_name = "N")]
    pub lines: Option<usize>,

    /// Vision-system budget per round, in milliseconds
    #[arg(long, value_name = "MS")]
    pub vision_time: Option<u64>,

    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Seed for Byzantine selection and round sampling
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Directory receiving consensus.log
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

impl Args {
    /// Flags given on the command line win over the file.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(n) = self.vehicles {
            config.total_vehicles = n;
        }
        if let Some(ratio) = self.byzantine_ratio {
            config.byzantine_ratio = ratio;
        }
        if let Some(lines) = self.lines {
            config.line_count = lines;
        }
        if let Some(ms) = self.vision_time {
            config.vision_time_ms = ms;
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["crossway"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.log_dir, PathBuf::from("logs"));

        let mut config = SimulationConfig::default();
        args.apply(&mut config);
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_flags_override_file_values() {
        let args = Args::try_parse_from([
            "crossway",
            "--vehicles",
            "20",
            "--byzantine-ratio",
            "0.25",
            "--lines",
            "2",
            "--vision-time",
            "250",
            "--transport",
            "in-memory",
            "--seed",
            "7",
        ])
        .unwrap();

        let mut config = SimulationConfig::default();
        args.apply(&mut config);
        assert_eq!(config.total_vehicles, 20);
        assert_eq!(config.byzantine_ratio, 0.25);
        assert_eq!(config.line_count, 2);
        assert_eq!(config.vision_time_ms, 250);
        assert_eq!(config.transport, TransportKind::InMemory);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        assert!(Args::try_parse_from(["crossway", "--transport", "carrier-pigeon"]).is_err());
    }
}
