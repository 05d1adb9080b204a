//! utils.rs
//!
//! Helpers shared across the crossway crates: wall-clock conversions,
//! list/set removal and uniform sampling of vehicle ids.

pub mod sample;
pub mod sets;
pub mod time;
