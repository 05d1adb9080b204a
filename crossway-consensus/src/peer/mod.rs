pub mod node;
pub mod server;

pub use node::PeerNode;
pub use server::{spawn_peer, PeerServer};
