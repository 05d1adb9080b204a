//! One intersection round: the pass loop, its shared state and its outcome.

pub mod config;
pub mod orchestrator;
pub mod report;
pub mod session;

pub use config::{DirectionSource, RoundConfig};
pub use orchestrator::RoundOrchestrator;
pub use report::RoundReport;
pub use session::{RoundSession, RoundState};
