//! Leader election tie-break.
//!
//! When a candidate broadcasts `ElectLeader`, every receiving peer compares
//! its own ballot with the requester's. The side with more votes wins; on a
//! tie the later timestamp wins, and a full tie goes to the local peer. The
//! loser becomes a follower carrying the winner's count and timestamp.
//!
//! The comparison is a pure function so it can be replayed and tested in
//! isolation; applying the outcome is up to the caller.

use chrono::{DateTime, Utc};

use crossway_common::{ElectionStatus, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    pub status: ElectionStatus,
    pub votes: u32,
    pub time: DateTime<Utc>,
}

impl Ballot {
    pub fn of(vehicle: &Vehicle) -> Self {
        Self {
            status: vehicle.election_status,
            votes: vehicle.votes_received,
            time: vehicle.election_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// The requester already lost elsewhere; nothing changes.
    RequesterIsFollower,
    /// The local peer lost and must adopt the requester's tally.
    LocalConceded { votes: u32, time: DateTime<Utc> },
    /// The requester lost and must adopt the local tally.
    RequesterDemoted { votes: u32, time: DateTime<Utc> },
}

impl ElectionOutcome {
    /// Whether the requester won this comparison.
    pub fn requester_wins(&self) -> bool {
        matches!(self, ElectionOutcome::LocalConceded { .. })
    }
}

pub fn decide(local: &Ballot, requester: &Ballot) -> ElectionOutcome {
    if requester.status == ElectionStatus::Follower {
        return ElectionOutcome::RequesterIsFollower;
    }

    let requester_wins = local.votes < requester.votes
        || (local.votes == requester.votes && requester.time > local.time);

    if requester_wins {
        ElectionOutcome::LocalConceded {
            votes: requester.votes,
            time: requester.time,
        }
    } else {
        ElectionOutcome::RequesterDemoted {
            votes: local.votes,
            time: local.time,
        }
    }
}
