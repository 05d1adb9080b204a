pub mod error;
pub mod grpc;
pub mod in_memory;

use async_trait::async_trait;

use crossway_common::Vehicle;

use crate::message::{PeerRequest, PeerResponse};
pub use error::NetworkError;

/// Transport between the round orchestrator and the peers of a round.
///
/// Peers are addressed by their vehicle address. Every call either yields
/// the peer's response or an error; callers treat errors as "this vote or
/// election does not count" and never retry.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Starts the peer for `vehicle` and returns once it accepts requests.
    async fn start_peer(&self, vehicle: Vehicle) -> Result<(), NetworkError>;

    /// Stops every peer started since the last call.
    async fn stop_all(&self);

    /// Endpoint text a peer at `address` is reachable under.
    fn endpoint(&self, address: i32) -> String;

    async fn register_vote(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError>;

    async fn elect_leader(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError>;

    async fn sync_votes(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError>;
}
