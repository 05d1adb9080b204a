use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crossway_common::Vehicle;

use super::{NetworkError, PeerNetwork};
use crate::message::{PeerRequest, PeerResponse};
use crate::peer::PeerNode;

/// Peers living in the same process, called directly instead of over a socket.
///
/// Used by tests and by simulations that do not need real ports. Individual
/// addresses can be marked unreachable to model a dropped connection.
#[derive(Clone)]
pub struct InMemoryNetwork {
    base_port: u16,
    peers: Arc<RwLock<HashMap<i32, Arc<PeerNode>>>>,
    unreachable: Arc<RwLock<HashSet<i32>>>,
}

impl InMemoryNetwork {
    pub fn new(base_port: u16) -> Self {
        Self {
            base_port,
            peers: Arc::new(RwLock::new(HashMap::new())),
            unreachable: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Every call to `address` fails with a connection error from now on.
    pub fn set_unreachable(&self, address: i32) {
        self.unreachable
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address);
    }

    /// Local record of a running peer, if any.
    pub async fn peer_snapshot(&self, address: i32) -> Option<Vehicle> {
        let node = self.lookup(address).ok()?;
        Some(node.snapshot().await)
    }

    pub fn running_peers(&self) -> usize {
        self.peers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lookup(&self, address: i32) -> Result<Arc<PeerNode>, NetworkError> {
        if self
            .unreachable
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&address)
        {
            return Err(NetworkError::Connection(format!("peer {} unreachable", address)));
        }
        self.peers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&address)
            .cloned()
            .ok_or(NetworkError::PeerNotFound(address))
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new(50051)
    }
}

#[async_trait]
impl PeerNetwork for InMemoryNetwork {
    async fn start_peer(&self, vehicle: Vehicle) -> Result<(), NetworkError> {
        let address = vehicle.address;
        let node = Arc::new(PeerNode::new(vehicle, self.endpoint(address)));
        let mut peers = self.peers.write().unwrap_or_else(|e| e.into_inner());
        if peers.contains_key(&address) {
            return Err(NetworkError::Bind(
                u16::try_from(i32::from(self.base_port) + address).unwrap_or(u16::MAX),
                "address already in use".into(),
            ));
        }
        peers.insert(address, node);
        Ok(())
    }

    async fn stop_all(&self) {
        self.peers.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn endpoint(&self, address: i32) -> String {
        (i32::from(self.base_port) + address).to_string()
    }

    async fn register_vote(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError> {
        let node = self.lookup(target)?;
        Ok(node.register_vote(&req).await)
    }

    async fn elect_leader(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError> {
        let node = self.lookup(target)?;
        Ok(node.elect_leader(&req).await)
    }

    async fn sync_votes(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError> {
        let node = self.lookup(target)?;
        Ok(node.sync_votes(&req).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ResponseStatus;
    use crossway_common::Direction::*;

    fn request(number: i32) -> PeerRequest {
        PeerRequest {
            vehicle: Vehicle::new(number, Rs),
            port: (50051 + number).to_string(),
            total_vehicles: 2,
        }
    }

    #[tokio::test]
    async fn test_start_call_and_stop() {
        let net = InMemoryNetwork::default();
        net.start_peer(Vehicle::new(1, Ls)).await.unwrap();
        assert_eq!(net.running_peers(), 1);

        let res = net.register_vote(1, request(2)).await.unwrap();
        assert!(res.is(ResponseStatus::Acknowledged));
        assert!(res.message.contains("50052"));

        net.stop_all().await;
        assert_eq!(net.running_peers(), 0);
        assert!(matches!(
            net.register_vote(1, request(2)).await,
            Err(NetworkError::PeerNotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_address_is_refused() {
        let net = InMemoryNetwork::default();
        net.start_peer(Vehicle::new(3, Ls)).await.unwrap();
        assert!(net.start_peer(Vehicle::new(3, Rs)).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let net = InMemoryNetwork::default();
        net.start_peer(Vehicle::new(1, Ls)).await.unwrap();
        net.set_unreachable(1);
        assert!(matches!(
            net.sync_votes(1, request(1)).await,
            Err(NetworkError::Connection(_))
        ));
    }
}
