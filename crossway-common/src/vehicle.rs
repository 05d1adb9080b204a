use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::utils::time::epoch;

/// Where a vehicle stands in the leader election of the current round.
///
/// The only legal transition is `Candidate -> Follower`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElectionStatus {
    #[default]
    Candidate,
    Follower,
}

impl ElectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ElectionStatus::Candidate => "Candidate",
            ElectionStatus::Follower => "Follower",
        }
    }

    /// Wire text to status. Anything other than `"Follower"` is a candidate,
    /// matching peers that never set the field.
    pub fn from_wire(s: &str) -> Self {
        if s == "Follower" {
            ElectionStatus::Follower
        } else {
            ElectionStatus::Candidate
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and path of a vehicle, without any election state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerRef {
    pub number: i32,
    pub address: i32,
    pub direction: Direction,
}

/// Level-1 entry of a conflict group, carrying its own level-2 children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoVehicle {
    pub number: i32,
    pub address: i32,
    pub direction: Direction,
    pub nested: Vec<PeerRef>,
}

impl CoVehicle {
    pub fn peer(&self) -> PeerRef {
        PeerRef {
            number: self.number,
            address: self.address,
            direction: self.direction,
        }
    }
}

impl From<PeerRef> for CoVehicle {
    fn from(p: PeerRef) -> Self {
        Self {
            number: p.number,
            address: p.address,
            direction: p.direction,
            nested: Vec::new(),
        }
    }
}

/// The record every RPC carries: identity, path, vote and election state,
/// plus the two-level tree of compatible co-vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub number: i32,
    pub address: i32,
    pub direction: Direction,
    /// One-shot latch: has this peer already answered a vote this round.
    pub has_voted: bool,
    pub votes_received: u32,
    pub election_votes: u32,
    pub election_status: ElectionStatus,
    pub election_time: DateTime<Utc>,
    pub co_vehicles: Vec<CoVehicle>,
}

impl Vehicle {
    /// Fresh candidate whose routing address equals its number.
    pub fn new(number: i32, direction: Direction) -> Self {
        Self::with_address(number, number, direction)
    }

    pub fn with_address(number: i32, address: i32, direction: Direction) -> Self {
        Self {
            number,
            address,
            direction,
            has_voted: false,
            votes_received: 0,
            election_votes: 0,
            election_status: ElectionStatus::Candidate,
            election_time: epoch(),
            co_vehicles: Vec::new(),
        }
    }

    pub fn peer(&self) -> PeerRef {
        PeerRef {
            number: self.number,
            address: self.address,
            direction: self.direction,
        }
    }

    pub fn is_candidate(&self) -> bool {
        self.election_status == ElectionStatus::Candidate
    }

    /// Demotes this record to follower, taking over the winner's tally.
    pub fn concede(&mut self, votes: u32, time: DateTime<Utc>) {
        self.election_status = ElectionStatus::Follower;
        self.votes_received = votes;
        self.election_time = time;
    }

    /// Records a compatible responder in the conflict group.
    ///
    /// The responder is nested under every level-1 entry whose path allows
    /// `response_direction`; when none does it becomes a new level-1 entry.
    /// Returns `true` when it was nested.
    pub fn merge_co_vehicle(&mut self, responder: PeerRef, response_direction: Direction) -> bool {
        let mut nested = false;
        for entry in self.co_vehicles.iter_mut() {
            if entry.direction.allows(response_direction) {
                entry.nested.push(responder);
                nested = true;
            }
        }
        if !nested {
            self.co_vehicles.push(CoVehicle::from(responder));
        }
        nested
    }

    /// Leader followed by its level-1 and level-2 co-vehicles, each number once,
    /// in tree order.
    pub fn conflict_group(&self) -> Vec<i32> {
        let mut group = vec![self.number];
        for entry in &self.co_vehicles {
            if !group.contains(&entry.number) {
                group.push(entry.number);
            }
            for child in &entry.nested {
                if !group.contains(&child.number) {
                    group.push(child.number);
                }
            }
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction::*;

    fn peer(number: i32, direction: Direction) -> PeerRef {
        PeerRef { number, address: number, direction }
    }

    #[test]
    fn test_new_vehicle_is_fresh_candidate() {
        let v = Vehicle::new(7, Rs);
        assert_eq!(v.address, 7);
        assert!(!v.has_voted);
        assert!(v.is_candidate());
        assert_eq!(v.votes_received, 0);
        assert!(v.co_vehicles.is_empty());
    }

    #[test]
    fn test_merge_appends_incompatible_responders_at_level_one() {
        let mut v = Vehicle::new(1, Rs);
        // Dl does not allow Rs, so two separate level-1 entries.
        assert!(!v.merge_co_vehicle(peer(2, Dl), Dl));
        assert!(!v.merge_co_vehicle(peer(3, Rs), Rs));
        assert_eq!(v.co_vehicles.len(), 2);
        assert!(v.co_vehicles.iter().all(|c| c.nested.is_empty()));
    }

    #[test]
    fn test_merge_nests_under_compatible_entry() {
        let mut v = Vehicle::new(1, Rs);
        v.merge_co_vehicle(peer(2, Ls), Ls);
        // Ls allows Ur -> nested under vehicle 2.
        assert!(v.merge_co_vehicle(peer(3, Ur), Ur));

        assert_eq!(v.co_vehicles.len(), 1);
        assert_eq!(v.co_vehicles[0].nested, vec![peer(3, Ur)]);
    }

    #[test]
    fn test_merge_uses_direction_of_existing_entry_as_key() {
        let mut v = Vehicle::new(1, Rr);
        v.merge_co_vehicle(peer(2, Dl), Dl);
        // Dl allows Rr but Rr does not allow Dl: the entry's list decides.
        assert!(v.merge_co_vehicle(peer(3, Rr), Rr));

        let mut w = Vehicle::new(1, Dl);
        w.merge_co_vehicle(peer(2, Rr), Rr);
        assert!(!w.merge_co_vehicle(peer(3, Dl), Dl));
        assert_eq!(w.co_vehicles.len(), 2);
    }

    #[test]
    fn test_conflict_group_deduplicates() {
        let mut v = Vehicle::new(1, Rs);
        v.merge_co_vehicle(peer(2, Us), Us);
        v.merge_co_vehicle(peer(3, Ds), Ds);
        v.merge_co_vehicle(peer(4, Rr), Rr);
        assert_eq!(v.co_vehicles.len(), 1);
        assert_eq!(v.conflict_group(), vec![1, 2, 3, 4]);

        // Us and Dl both allow Rr: 13 lands under both entries.
        let mut w = Vehicle::new(10, Rr);
        w.co_vehicles.push(CoVehicle::from(peer(11, Us)));
        w.co_vehicles.push(CoVehicle::from(peer(12, Dl)));
        w.merge_co_vehicle(peer(13, Rr), Rr);
        assert_eq!(w.co_vehicles[0].nested.len(), 1);
        assert_eq!(w.co_vehicles[1].nested.len(), 1);
        assert_eq!(w.conflict_group(), vec![10, 11, 13, 12]);
    }

    #[test]
    fn test_concede_demotes_and_adopts_tally() {
        let mut v = Vehicle::new(1, Rs);
        let t = Utc::now();
        v.concede(4, t);
        assert_eq!(v.election_status, ElectionStatus::Follower);
        assert_eq!(v.votes_received, 4);
        assert_eq!(v.election_time, t);
    }

    #[test]
    fn test_election_status_wire_text() {
        assert_eq!(ElectionStatus::from_wire("Follower"), ElectionStatus::Follower);
        assert_eq!(ElectionStatus::from_wire("Candidate"), ElectionStatus::Candidate);
        assert_eq!(ElectionStatus::from_wire(""), ElectionStatus::Candidate);
    }
}
