use std::collections::{HashMap, HashSet};

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crossway_common::{
    utils::{sample::select_random, sets::remove_value},
    Direction, Vehicle,
};

/// Mutable state of one round. Only ever touched through `RoundSession::state`.
#[derive(Debug, Default)]
pub struct RoundState {
    /// Vehicles still waiting at the intersection.
    pub active: Vec<i32>,
    /// Byzantine vehicles still waiting. Always a subset of `active`.
    pub byzantine: Vec<i32>,
    /// Orchestrator-side tally per candidate, rebuilt every pass.
    pub aggregates: HashMap<i32, Vehicle>,
    pub passed: usize,
    pub leaders: Vec<i32>,
    pass_leader: Option<i32>,
    syncs: Vec<AbortHandle>,
}

impl RoundState {
    pub fn new(vehicles: &[i32], byzantine: &HashSet<i32>) -> Self {
        Self {
            active: vehicles.to_vec(),
            byzantine: vehicles
                .iter()
                .copied()
                .filter(|v| byzantine.contains(v))
                .collect(),
            ..Default::default()
        }
    }

    pub fn is_byzantine(&self, vehicle: i32) -> bool {
        self.byzantine.contains(&vehicle)
    }

    /// Active vehicles that take part in negotiation.
    pub fn participants(&self) -> Vec<i32> {
        self.active
            .iter()
            .copied()
            .filter(|v| !self.is_byzantine(*v))
            .collect()
    }

    pub fn aggregate_mut(&mut self, vehicle: i32, direction: Direction) -> &mut Vehicle {
        self.aggregates
            .entry(vehicle)
            .or_insert_with(|| Vehicle::new(vehicle, direction))
    }

    pub fn pass_leader(&self) -> Option<i32> {
        self.pass_leader
    }

    /// Counts `vehicle` as crossed. Returns `false` if it was not active.
    pub fn pass_vehicle(&mut self, vehicle: i32) -> bool {
        if !remove_value(&mut self.active, &vehicle) {
            return false;
        }
        remove_value(&mut self.byzantine, &vehicle);
        self.passed += 1;
        true
    }

    /// Lets the leader and its whole conflict group cross.
    ///
    /// Returns the vehicles actually removed. Only one leader per pass; later
    /// calls in the same pass remove nothing.
    pub fn declare_leader(&mut self, leader: &Vehicle) -> Vec<i32> {
        if self.pass_leader.is_some() {
            return Vec::new();
        }
        self.pass_leader = Some(leader.number);
        self.leaders.push(leader.number);
        leader
            .conflict_group()
            .into_iter()
            .filter(|v| self.pass_vehicle(*v))
            .collect()
    }

    /// Vision system clears every non-Byzantine vehicle.
    pub fn clear_visible(&mut self) -> Vec<i32> {
        self.participants()
            .into_iter()
            .filter(|v| self.pass_vehicle(*v))
            .collect()
    }

    /// Some Byzantine vehicles (possibly none) give up waiting and drive off.
    pub fn release_byzantine<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<i32> {
        let count = rng.gen_range(0..=self.byzantine.len());
        let chosen = select_random(&self.byzantine, count, rng);
        chosen
            .into_iter()
            .filter(|v| self.pass_vehicle(*v))
            .collect()
    }

    pub fn track_sync(&mut self, handle: AbortHandle) {
        self.syncs.push(handle);
    }

    /// Resets per-pass state. Stray syncs from the previous pass are dropped.
    pub fn begin_pass(&mut self) {
        self.abort_syncs();
        self.aggregates.clear();
        self.pass_leader = None;
    }

    pub fn abort_syncs(&mut self) {
        for handle in self.syncs.drain(..) {
            handle.abort();
        }
    }
}

/// State shared between the orchestrator and the tasks of a round.
pub struct RoundSession {
    pub state: Mutex<RoundState>,
    shutdown: CancellationToken,
}

impl RoundSession {
    pub fn new(vehicles: &[i32], byzantine: &HashSet<i32>, shutdown: CancellationToken) -> Self {
        Self {
            state: Mutex::new(RoundState::new(vehicles, byzantine)),
            shutdown,
        }
    }

    /// Token for a single pass. Cancelled when the pass ends or the round is shut down.
    pub fn pass_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossway_common::{CoVehicle, Direction::*, PeerRef};
    use rand::{rngs::StdRng, SeedableRng};

    fn peer(number: i32, direction: Direction) -> PeerRef {
        PeerRef { number, address: number, direction }
    }

    #[test]
    fn test_participants_skip_byzantine() {
        let state = RoundState::new(&[1, 2, 3, 4], &HashSet::from([2, 9]));
        assert_eq!(state.byzantine, vec![2]);
        assert_eq!(state.participants(), vec![1, 3, 4]);
    }

    #[test]
    fn test_leader_removes_whole_conflict_group() {
        let mut state = RoundState::new(&[1, 2, 3, 4, 5, 6], &HashSet::new());

        let mut leader = Vehicle::new(1, Rr);
        leader.co_vehicles.push(CoVehicle::from(peer(2, Us)));
        leader.co_vehicles.push(CoVehicle::from(peer(3, Dl)));
        // 4 sits under both level-1 entries, 9 is not part of the round.
        leader.merge_co_vehicle(peer(4, Rr), Rr);
        leader.co_vehicles[1].nested.push(peer(9, Ls));

        let removed = state.declare_leader(&leader);
        assert_eq!(removed, vec![1, 2, 4, 3]);
        assert_eq!(state.active, vec![5, 6]);
        assert_eq!(state.passed, 4);
        assert_eq!(state.leaders, vec![1]);
    }

    #[test]
    fn test_one_leader_per_pass() {
        let mut state = RoundState::new(&[1, 2, 3], &HashSet::new());
        assert_eq!(state.declare_leader(&Vehicle::new(1, Rs)), vec![1]);
        assert!(state.declare_leader(&Vehicle::new(2, Rs)).is_empty());
        assert_eq!(state.active, vec![2, 3]);

        state.begin_pass();
        assert_eq!(state.declare_leader(&Vehicle::new(2, Rs)), vec![2]);
        assert_eq!(state.leaders, vec![1, 2]);
    }

    #[test]
    fn test_clear_visible_leaves_byzantine() {
        let mut state = RoundState::new(&[1, 2, 3, 4], &HashSet::from([3]));
        assert_eq!(state.clear_visible(), vec![1, 2, 4]);
        assert_eq!(state.active, vec![3]);
        assert_eq!(state.passed, 3);
    }

    #[test]
    fn test_release_only_touches_byzantine() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = RoundState::new(&[1, 2, 3, 4, 5], &HashSet::from([2, 4]));
        let mut released = Vec::new();
        while !state.byzantine.is_empty() {
            released.extend(state.release_byzantine(&mut rng));
        }
        released.sort();
        assert_eq!(released, vec![2, 4]);
        assert_eq!(state.active, vec![1, 3, 5]);
        assert_eq!(state.passed, 2);
    }

    #[test]
    fn test_pass_vehicle_counts_once() {
        let mut state = RoundState::new(&[7], &HashSet::new());
        assert!(state.pass_vehicle(7));
        assert!(!state.pass_vehicle(7));
        assert_eq!(state.passed, 1);
    }
}
