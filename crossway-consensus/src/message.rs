use std::fmt;

use crossway_common::{Direction, Vehicle};

/// Outcome reported by a peer for any of the three operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Acknowledged,
    Ignored,
    Success,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Acknowledged => "acknowledged",
            ResponseStatus::Ignored => "ignored",
            ResponseStatus::Success => "success",
            ResponseStatus::Failed => "failed",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "acknowledged" => Some(ResponseStatus::Acknowledged),
            "ignored" => Some(ResponseStatus::Ignored),
            "success" => Some(ResponseStatus::Success),
            "failed" => Some(ResponseStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope sent to a peer.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerRequest {
    /// Snapshot of the sending vehicle.
    pub vehicle: Vehicle,
    /// Sender's endpoint, as text.
    pub port: String,
    /// Size of the round's active set when the request was built.
    pub total_vehicles: u32,
}

/// Envelope returned by a peer.
///
/// `vehicle` depends on the operation: for `RegisterVote` it is the
/// responder's own snapshot; for an `ignored` `ElectLeader` it is the
/// requester's record after being demoted by the responder.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerResponse {
    pub message: String,
    pub status: ResponseStatus,
    /// Only set on acknowledged votes.
    pub compatible: Option<bool>,
    pub response_direction: Option<Direction>,
    pub vehicle: Option<Vehicle>,
}

impl PeerResponse {
    pub fn new(status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            compatible: None,
            response_direction: None,
            vehicle: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn is(&self, status: ResponseStatus) -> bool {
        self.status == status
    }
}
