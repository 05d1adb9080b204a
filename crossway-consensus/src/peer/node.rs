use tokio::sync::Mutex;
use tracing::debug;

use crossway_common::Vehicle;

use crate::election::{decide, Ballot, ElectionOutcome};
use crate::message::{PeerRequest, PeerResponse, ResponseStatus};

/// Negotiating state of one vehicle for one round.
///
/// The record behind the mutex is the peer's local truth; every operation
/// takes the lock for its whole duration.
pub struct PeerNode {
    port: String,
    vehicle: Mutex<Vehicle>,
}

impl PeerNode {
    pub fn new(vehicle: Vehicle, port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            vehicle: Mutex::new(vehicle),
        }
    }

    pub async fn snapshot(&self) -> Vehicle {
        self.vehicle.lock().await.clone()
    }

    /// Answers at most one vote per round.
    ///
    /// The first caller gets `acknowledged` with the compatibility of its path
    /// against ours; every later caller gets `ignored`.
    pub async fn register_vote(&self, req: &PeerRequest) -> PeerResponse {
        let mut local = self.vehicle.lock().await;

        if local.has_voted {
            return PeerResponse::new(
                ResponseStatus::Ignored,
                format!("Vehicle {} has already voted", local.number),
            )
            .with_vehicle(local.clone());
        }

        local.has_voted = true;
        let compatible = req.vehicle.direction.allows(local.direction);
        debug!(
            "vote from {} ({}) to {} ({}): compatible={}",
            req.vehicle.number, req.vehicle.direction, local.number, local.direction, compatible
        );

        PeerResponse {
            message: format!("Vote registered from port {} to port {}", req.port, self.port),
            status: ResponseStatus::Acknowledged,
            compatible: Some(compatible),
            response_direction: Some(local.direction),
            vehicle: Some(local.clone()),
        }
    }

    /// Compares our ballot with the requester's and demotes the loser.
    ///
    /// When we lose, our own record becomes a follower. When the requester
    /// loses, its demoted record is sent back inside the response.
    pub async fn elect_leader(&self, req: &PeerRequest) -> PeerResponse {
        let mut local = self.vehicle.lock().await;

        match decide(&Ballot::of(&local), &Ballot::of(&req.vehicle)) {
            ElectionOutcome::RequesterIsFollower => PeerResponse::new(
                ResponseStatus::Ignored,
                format!("Vehicle {} is follower", req.vehicle.number),
            ),
            ElectionOutcome::LocalConceded { votes, time } => {
                local.concede(votes, time);
                PeerResponse::new(
                    ResponseStatus::Acknowledged,
                    format!("Vehicle {} follows vehicle {}", local.number, req.vehicle.number),
                )
                .with_vehicle(local.clone())
            }
            ElectionOutcome::RequesterDemoted { votes, time } => {
                let mut demoted = req.vehicle.clone();
                demoted.concede(votes, time);
                PeerResponse::new(
                    ResponseStatus::Ignored,
                    format!("Vehicle {} outranks vehicle {}", local.number, req.vehicle.number),
                )
                .with_vehicle(demoted)
            }
        }
    }

    /// Copies the orchestrator's tally into our record if it is about us.
    pub async fn sync_votes(&self, req: &PeerRequest) -> PeerResponse {
        let mut local = self.vehicle.lock().await;

        if local.number != req.vehicle.number {
            return PeerResponse::new(
                ResponseStatus::Failed,
                format!("Number mismatch. Failed to update vehicle {}.", req.vehicle.number),
            );
        }

        local.votes_received = req.vehicle.votes_received;
        local.election_time = req.vehicle.election_time;
        PeerResponse::new(
            ResponseStatus::Success,
            format!("Vote count updated for vehicle {}.", local.number),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossway_common::{utils::time::from_nanos, Direction::*, ElectionStatus};

    fn request(vehicle: Vehicle) -> PeerRequest {
        PeerRequest {
            port: (50051 + vehicle.address).to_string(),
            vehicle,
            total_vehicles: 3,
        }
    }

    fn with_tally(number: i32, votes: u32, nanos: i64) -> Vehicle {
        let mut v = Vehicle::new(number, Rs);
        v.votes_received = votes;
        v.election_time = from_nanos(nanos);
        v
    }

    #[tokio::test]
    async fn test_vote_latch_acknowledges_once() {
        let node = PeerNode::new(Vehicle::new(1, Ls), "50052");

        let first = node.register_vote(&request(Vehicle::new(2, Rs))).await;
        assert!(first.is(ResponseStatus::Acknowledged));
        assert_eq!(first.compatible, Some(true));
        assert_eq!(first.response_direction, Some(Ls));
        assert_eq!(first.vehicle.unwrap().number, 1);

        for other in [2, 3, 4] {
            let again = node.register_vote(&request(Vehicle::new(other, Rs))).await;
            assert!(again.is(ResponseStatus::Ignored));
            assert_eq!(again.compatible, None);
        }
        assert!(node.snapshot().await.has_voted);
    }

    #[tokio::test]
    async fn test_vote_compatibility_is_checked_from_requester_side() {
        // Dl allows Rr, Rr does not allow Dl.
        let node = PeerNode::new(Vehicle::new(1, Rr), "50052");
        let res = node.register_vote(&request(Vehicle::new(2, Dl))).await;
        assert_eq!(res.compatible, Some(true));

        let node = PeerNode::new(Vehicle::new(1, Dl), "50052");
        let res = node.register_vote(&request(Vehicle::new(2, Rr))).await;
        assert_eq!(res.compatible, Some(false));
        assert!(res.is(ResponseStatus::Acknowledged));
    }

    #[tokio::test]
    async fn test_concurrent_votes_only_one_acknowledged() {
        let node = std::sync::Arc::new(PeerNode::new(Vehicle::new(1, Us), "50052"));
        let mut handles = Vec::new();
        for n in 2..12 {
            let node = node.clone();
            handles.push(tokio::spawn(async move {
                node.register_vote(&request(Vehicle::new(n, Ds))).await
            }));
        }
        let mut acks = 0;
        for h in handles {
            if h.await.unwrap().is(ResponseStatus::Acknowledged) {
                acks += 1;
            }
        }
        assert_eq!(acks, 1);
    }

    #[tokio::test]
    async fn test_elect_leader_local_concedes_to_more_votes() {
        let node = PeerNode::new(with_tally(1, 1, 100), "50052");
        let res = node.elect_leader(&request(with_tally(2, 2, 50))).await;

        assert!(res.is(ResponseStatus::Acknowledged));
        let local = node.snapshot().await;
        assert_eq!(local.election_status, ElectionStatus::Follower);
        assert_eq!(local.votes_received, 2);
        assert_eq!(local.election_time, from_nanos(50));
    }

    #[tokio::test]
    async fn test_elect_leader_tie_later_requester_wins() {
        let node = PeerNode::new(with_tally(1, 2, 100), "50052");
        let res = node.elect_leader(&request(with_tally(2, 2, 200))).await;
        assert!(res.is(ResponseStatus::Acknowledged));
        assert_eq!(node.snapshot().await.election_status, ElectionStatus::Follower);
    }

    #[tokio::test]
    async fn test_elect_leader_demotes_requester_by_value() {
        let node = PeerNode::new(with_tally(1, 2, 300), "50052");
        let requester = with_tally(2, 2, 200);
        let res = node.elect_leader(&request(requester.clone())).await;

        assert!(res.is(ResponseStatus::Ignored));
        let demoted = res.vehicle.unwrap();
        assert_eq!(demoted.number, 2);
        assert_eq!(demoted.election_status, ElectionStatus::Follower);
        assert_eq!(demoted.votes_received, 2);
        assert_eq!(demoted.election_time, from_nanos(300));

        // Local record untouched.
        let local = node.snapshot().await;
        assert!(local.is_candidate());
        assert_eq!(local.election_time, from_nanos(300));
    }

    #[tokio::test]
    async fn test_elect_leader_ignores_follower_requester() {
        let node = PeerNode::new(with_tally(1, 0, 0), "50052");
        let mut requester = with_tally(2, 5, 500);
        requester.election_status = ElectionStatus::Follower;

        let res = node.elect_leader(&request(requester)).await;
        assert!(res.is(ResponseStatus::Ignored));
        assert!(res.vehicle.is_none());
        assert!(node.snapshot().await.is_candidate());
    }

    #[tokio::test]
    async fn test_sync_votes_matches_identity() {
        let node = PeerNode::new(Vehicle::new(1, Rs), "50052");

        let res = node.sync_votes(&request(with_tally(1, 3, 900))).await;
        assert!(res.is(ResponseStatus::Success));
        let local = node.snapshot().await;
        assert_eq!(local.votes_received, 3);
        assert_eq!(local.election_time, from_nanos(900));

        let res = node.sync_votes(&request(with_tally(2, 7, 999))).await;
        assert!(res.is(ResponseStatus::Failed));
        assert_eq!(node.snapshot().await.votes_received, 3);
    }
}
