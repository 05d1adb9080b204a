pub mod cli;
pub mod config;
pub mod driver;
pub mod logging;
pub mod report;

pub use config::{SampleMode, SimulationConfig, TransportKind};
pub use driver::SimulationDriver;
pub use report::SimulationReport;

pub type Result<T> = std::result::Result<T, crossway_common::CrosswayError>;
