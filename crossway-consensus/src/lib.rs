pub mod election;
pub mod message;
pub mod network;
pub mod peer;
pub mod quorum;
pub mod round;
pub mod rpc;

pub use election::{decide, Ballot, ElectionOutcome};
pub use message::{PeerRequest, PeerResponse, ResponseStatus};
pub use network::{grpc::GrpcNetwork, in_memory::InMemoryNetwork, NetworkError, PeerNetwork};
pub use peer::node::PeerNode;
pub use quorum::QuorumPolicy;
pub use round::{
    config::{DirectionSource, RoundConfig},
    orchestrator::RoundOrchestrator,
    report::RoundReport,
};
