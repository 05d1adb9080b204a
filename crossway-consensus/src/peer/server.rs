use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{transport::Server, Request, Response, Status};
use tracing::{debug, warn};

use crate::message::PeerRequest;
use crate::network::NetworkError;
use crate::peer::node::PeerNode;
use crate::rpc::proto::{
    vehicle_service_server::{VehicleService, VehicleServiceServer},
    Request as WireRequest, Response as WireResponse,
};

const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// gRPC face of a [`PeerNode`].
pub struct VehicleServiceImpl {
    node: Arc<PeerNode>,
}

fn decode(request: Request<WireRequest>) -> Result<PeerRequest, Status> {
    Ok(PeerRequest::try_from(request.into_inner())?)
}

#[tonic::async_trait]
impl VehicleService for VehicleServiceImpl {
    async fn register_vote(
        &self,
        request: Request<WireRequest>,
    ) -> Result<Response<WireResponse>, Status> {
        let req = decode(request)?;
        Ok(Response::new(self.node.register_vote(&req).await.into()))
    }

    async fn elect_leader(
        &self,
        request: Request<WireRequest>,
    ) -> Result<Response<WireResponse>, Status> {
        let req = decode(request)?;
        Ok(Response::new(self.node.elect_leader(&req).await.into()))
    }

    async fn sync_votes(
        &self,
        request: Request<WireRequest>,
    ) -> Result<Response<WireResponse>, Status> {
        let req = decode(request)?;
        Ok(Response::new(self.node.sync_votes(&req).await.into()))
    }
}

/// A running peer server and the means to stop it.
pub struct PeerServer {
    pub port: u16,
    shutdown_sender: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PeerServer {
    /// Signals shutdown and waits briefly for in-flight calls to finish.
    pub async fn stop(mut self) {
        if let Some(sender) = self.shutdown_sender.take() {
            let _ = sender.send(());
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.handle).await.is_err() {
            warn!("peer on port {} did not stop in time, aborting", self.port);
            self.handle.abort();
        }
    }
}

/// Binds `127.0.0.1:port` and serves `node` until [`PeerServer::stop`].
///
/// The listener is bound before returning, so the peer accepts connections
/// as soon as this resolves.
pub async fn spawn_peer(node: Arc<PeerNode>, port: u16) -> Result<PeerServer, NetworkError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| NetworkError::Bind(port, e.to_string()))?;

    let service = VehicleServiceServer::new(VehicleServiceImpl { node })
        .max_decoding_message_size(MAX_MESSAGE_SIZE)
        .max_encoding_message_size(MAX_MESSAGE_SIZE);

    let (shutdown_sender, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let incoming = TcpListenerStream::new(listener);
        let result = Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(incoming, async {
                let _ = shutdown_rx.await;
            })
            .await;
        match result {
            Ok(()) => debug!("peer on port {} stopped", port),
            Err(e) => warn!("peer on port {} failed to serve: {}", port, e),
        }
    });

    Ok(PeerServer {
        port,
        shutdown_sender: Some(shutdown_sender),
        handle,
    })
}
