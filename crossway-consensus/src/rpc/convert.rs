use crossway_common::{
    utils::time::{from_nanos, to_nanos},
    CoVehicle, CrosswayError, Direction, ElectionStatus, PeerRef, Result, Vehicle,
};

use super::proto;
use crate::message::{PeerRequest, PeerResponse, ResponseStatus};

fn clamp_count(value: i32) -> u32 {
    value.max(0) as u32
}

fn wire_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn peer_to_wire(peer: &PeerRef) -> proto::Vehicle {
    proto::Vehicle {
        number: peer.number,
        address: peer.address,
        direction: peer.direction.code().to_string(),
        election_status: ElectionStatus::Candidate.as_str().to_string(),
        ..Default::default()
    }
}

fn peer_from_wire(v: &proto::Vehicle) -> Result<PeerRef> {
    Ok(PeerRef {
        number: v.number,
        address: v.address,
        direction: v.direction.parse()?,
    })
}

impl From<&Vehicle> for proto::Vehicle {
    fn from(v: &Vehicle) -> Self {
        proto::Vehicle {
            number: v.number,
            address: v.address,
            direction: v.direction.code().to_string(),
            send_votes: i32::from(v.has_voted),
            receive_votes: wire_count(v.votes_received),
            election_vote: wire_count(v.election_votes),
            election_status: v.election_status.as_str().to_string(),
            election_time_nanos: to_nanos(v.election_time),
            covehicle: v
                .co_vehicles
                .iter()
                .map(|c| proto::Vehicle {
                    covehicle: c.nested.iter().map(peer_to_wire).collect(),
                    ..peer_to_wire(&c.peer())
                })
                .collect(),
        }
    }
}

/// Decodes a wire vehicle. Anything nested below the second level is dropped.
impl TryFrom<proto::Vehicle> for Vehicle {
    type Error = CrosswayError;

    fn try_from(v: proto::Vehicle) -> Result<Self> {
        let co_vehicles = v
            .covehicle
            .iter()
            .map(|entry| {
                Ok(CoVehicle {
                    number: entry.number,
                    address: entry.address,
                    direction: entry.direction.parse()?,
                    nested: entry
                        .covehicle
                        .iter()
                        .map(peer_from_wire)
                        .collect::<Result<Vec<_>>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Vehicle {
            number: v.number,
            address: v.address,
            direction: v.direction.parse()?,
            has_voted: v.send_votes != 0,
            votes_received: clamp_count(v.receive_votes),
            election_votes: clamp_count(v.election_vote),
            election_status: ElectionStatus::from_wire(&v.election_status),
            election_time: from_nanos(v.election_time_nanos),
            co_vehicles,
        })
    }
}

impl From<&PeerRequest> for proto::Request {
    fn from(req: &PeerRequest) -> Self {
        proto::Request {
            vehicle: Some(proto::Vehicle::from(&req.vehicle)),
            port: req.port.clone(),
            total_vehicles: wire_count(req.total_vehicles),
        }
    }
}

impl TryFrom<proto::Request> for PeerRequest {
    type Error = CrosswayError;

    fn try_from(req: proto::Request) -> Result<Self> {
        let vehicle = req
            .vehicle
            .ok_or_else(|| CrosswayError::MalformedRequest("request carries no vehicle".into()))?;
        Ok(PeerRequest {
            vehicle: Vehicle::try_from(vehicle)?,
            port: req.port,
            total_vehicles: clamp_count(req.total_vehicles),
        })
    }
}

impl From<PeerResponse> for proto::Response {
    fn from(res: PeerResponse) -> Self {
        let direction_status = match res.compatible {
            Some(true) => "True",
            Some(false) => "False",
            None => "",
        };
        proto::Response {
            message: res.message,
            status: res.status.as_str().to_string(),
            direction_status: direction_status.to_string(),
            response_direction: res
                .response_direction
                .map(|d| d.code().to_string())
                .unwrap_or_default(),
            vehicle: res.vehicle.as_ref().map(proto::Vehicle::from),
        }
    }
}

impl TryFrom<proto::Response> for PeerResponse {
    type Error = CrosswayError;

    fn try_from(res: proto::Response) -> Result<Self> {
        let status = ResponseStatus::from_wire(&res.status).ok_or_else(|| {
            CrosswayError::MalformedRequest(format!("unknown response status '{}'", res.status))
        })?;
        let compatible = match res.direction_status.as_str() {
            "True" => Some(true),
            "False" => Some(false),
            _ => None,
        };
        let response_direction = if res.response_direction.is_empty() {
            None
        } else {
            Some(res.response_direction.parse::<Direction>()?)
        };
        Ok(PeerResponse {
            message: res.message,
            status,
            compatible,
            response_direction,
            vehicle: res.vehicle.map(Vehicle::try_from).transpose()?,
        })
    }
}
