//! Shared model of the intersection: direction codes, the vehicle record
//! exchanged between peers, errors and small helpers.

pub mod direction;
pub mod error;
pub mod utils;
pub mod vehicle;

pub use direction::{compatible, Direction};
pub use error::{CrosswayError, Result};
pub use vehicle::{CoVehicle, ElectionStatus, PeerRef, Vehicle};
