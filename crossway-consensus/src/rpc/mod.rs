//! gRPC wire schema and the conversions between it and the domain types.

pub mod convert;

pub mod proto {
    tonic::include_proto!("crossway");
}
