//! QUIC transport for the forwarder: endpoints that accept/open connections
//! and hand each one back as a `Face` for the caller to register.
//!
//! This crate holds no forwarding state of its own. `NdnQuicServer` and
//! `NdnQuicClient` just wrap a `quinn::Endpoint` and yield `PendingFace`s;
//! the caller registers the face with its own (single-threaded) `Forwarder`
//! and then calls `bind_face_id` so the face's background tasks know which
//! id to tag inbound packets with.

pub mod config;
pub mod fragmentation;
pub mod quic_face;

pub use config::{ClientOptions, ServerOptions};
pub use quic_face::QuicFace;

use anyhow::{Context, Result};
use bytes::Bytes;
use ndnlt_forwarder::face::FaceKind;
use quinn::{Connection, Endpoint};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{mpsc, Arc};

/// Well-known port ndn-lite forwarders listen on over QUIC.
pub const NDN_QUIC_PORT: u16 = 6367;
/// ALPN protocol id negotiated by both ends.
pub const NDN_QUIC_ALPN: &[u8] = b"ndn1";
/// Datagram MTU assumed when fragmenting packets onto uni streams.
pub const MAX_DATAGRAM_SIZE: usize = 1200;

/// Binds the id a forwarder assigned a face onto the cell its background
/// tasks read from. Must be called right after `register_face` returns;
/// until then the face tags inbound packets with `INVALID_ID`.
pub fn bind_face_id(cell: &Arc<AtomicU16>, face_id: u16) {
    cell.store(face_id, Ordering::Release);
}

/// A QUIC connection that has been accepted or opened but not yet registered
/// with a forwarder.
pub struct PendingFace {
    pub face: QuicFace,
    pub face_id_cell: Arc<AtomicU16>,
    pub remote: SocketAddr,
}

impl PendingFace {
    fn new(connection: Connection, kind: FaceKind, inbound: mpsc::Sender<(u16, Bytes)>) -> Self {
        let remote = connection.remote_address();
        let (face, face_id_cell) = QuicFace::spawn(connection, kind, MAX_DATAGRAM_SIZE, inbound);
        Self {
            face,
            face_id_cell,
            remote,
        }
    }
}

/// Listens for incoming QUIC connections and turns each one into a
/// `PendingFace`.
pub struct NdnQuicServer {
    endpoint: Endpoint,
    inbound: mpsc::Sender<(u16, Bytes)>,
}

impl NdnQuicServer {
    pub async fn bind(options: &ServerOptions, inbound: mpsc::Sender<(u16, Bytes)>) -> Result<Self> {
        let server_config = config::configure_server(options).await?;
        let addr: SocketAddr = options
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", options.listen_addr))?;
        let endpoint = Endpoint::server(server_config, addr)
            .with_context(|| format!("failed to bind QUIC endpoint on {addr}"))?;
        Ok(Self { endpoint, inbound })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Waits for the next incoming connection and turns it into a face.
    /// Returns `None` once the endpoint has been closed.
    pub async fn accept(&self) -> Option<PendingFace> {
        let connecting = self.endpoint.accept().await?;
        match connecting.await {
            Ok(connection) => Some(PendingFace::new(connection, FaceKind::Net, self.inbound.clone())),
            Err(e) => {
                log::warn!("incoming QUIC connection failed: {e}");
                None
            }
        }
    }

    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"shutdown");
    }
}

/// Opens outgoing QUIC connections.
pub struct NdnQuicClient {
    endpoint: Endpoint,
    inbound: mpsc::Sender<(u16, Bytes)>,
}

impl NdnQuicClient {
    pub async fn new(options: &ClientOptions, inbound: mpsc::Sender<(u16, Bytes)>) -> Result<Self> {
        let client_config = config::configure_client(options).await?;
        let mut endpoint =
            Endpoint::client("0.0.0.0:0".parse().unwrap()).context("failed to bind client QUIC endpoint")?;
        endpoint.set_default_client_config(client_config);
        Ok(Self { endpoint, inbound })
    }

    pub async fn connect(&self, addr: SocketAddr, server_name: &str) -> Result<PendingFace> {
        let connection = self
            .endpoint
            .connect(addr, server_name)
            .with_context(|| format!("failed to start connecting to {addr}"))?
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        Ok(PendingFace::new(connection, FaceKind::Net, self.inbound.clone()))
    }

    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"shutdown");
    }
}
