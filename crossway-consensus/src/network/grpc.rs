use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crossway_common::Vehicle;

use super::{NetworkError, PeerNetwork};
use crate::message::{PeerRequest, PeerResponse};
use crate::peer::{spawn_peer, PeerNode, PeerServer};
use crate::rpc::proto::{
    vehicle_service_client::VehicleServiceClient, Request as WireRequest, Response as WireResponse,
};

/// Default bound on every peer call.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(2);

/// Peers served over gRPC on loopback, one port per vehicle at
/// `base_port + address`.
pub struct GrpcNetwork {
    base_port: u16,
    rpc_timeout: Duration,
    servers: Mutex<Vec<PeerServer>>,
}

impl GrpcNetwork {
    pub fn new(base_port: u16) -> Self {
        Self::with_timeout(base_port, RPC_TIMEOUT)
    }

    pub fn with_timeout(base_port: u16, rpc_timeout: Duration) -> Self {
        Self {
            base_port,
            rpc_timeout,
            servers: Mutex::new(Vec::new()),
        }
    }

    pub fn port_of(&self, address: i32) -> Result<u16, NetworkError> {
        i32::from(self.base_port)
            .checked_add(address)
            .and_then(|p| u16::try_from(p).ok())
            .ok_or(NetworkError::PeerNotFound(address))
    }

    async fn client(&self, address: i32) -> Result<VehicleServiceClient<Channel>, NetworkError> {
        let port = self.port_of(address)?;
        let channel = Endpoint::from_shared(format!("http://127.0.0.1:{}", port))
            .map_err(|e| NetworkError::Connection(e.to_string()))?
            .connect_timeout(self.rpc_timeout)
            .timeout(self.rpc_timeout)
            .connect()
            .await
            .map_err(|e| NetworkError::Connection(e.to_string()))?;
        Ok(VehicleServiceClient::new(channel))
    }

    /// Runs one call under the RPC timeout and decodes its reply.
    async fn bounded<F>(&self, call: F) -> Result<PeerResponse, NetworkError>
    where
        F: Future<Output = Result<tonic::Response<WireResponse>, NetworkError>> + Send,
    {
        let reply = tokio::time::timeout(self.rpc_timeout, call)
            .await
            .map_err(|_| NetworkError::Timeout(self.rpc_timeout))??
            .into_inner();
        if reply.status.is_empty() {
            return Err(NetworkError::EmptyResponse);
        }
        PeerResponse::try_from(reply).map_err(|e| NetworkError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl PeerNetwork for GrpcNetwork {
    async fn start_peer(&self, vehicle: Vehicle) -> Result<(), NetworkError> {
        let port = self.port_of(vehicle.address)?;
        let node = Arc::new(PeerNode::new(vehicle, port.to_string()));
        let server = spawn_peer(node, port).await?;
        debug!("peer listening on 127.0.0.1:{}", port);
        self.servers.lock().await.push(server);
        Ok(())
    }

    async fn stop_all(&self) {
        let servers: Vec<PeerServer> = self.servers.lock().await.drain(..).collect();
        futures::future::join_all(servers.into_iter().map(PeerServer::stop)).await;
    }

    fn endpoint(&self, address: i32) -> String {
        (i32::from(self.base_port) + address).to_string()
    }

    async fn register_vote(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError> {
        let wire = WireRequest::from(&req);
        self.bounded(async move {
            let mut client = self.client(target).await?;
            Ok::<_, NetworkError>(client.register_vote(wire).await?)
        })
        .await
    }

    async fn elect_leader(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError> {
        let wire = WireRequest::from(&req);
        self.bounded(async move {
            let mut client = self.client(target).await?;
            Ok::<_, NetworkError>(client.elect_leader(wire).await?)
        })
        .await
    }

    async fn sync_votes(&self, target: i32, req: PeerRequest) -> Result<PeerResponse, NetworkError> {
        let wire = WireRequest::from(&req);
        self.bounded(async move {
            let mut client = self.client(target).await?;
            Ok::<_, NetworkError>(client.sync_votes(wire).await?)
        })
        .await
    }
}
