//! Wiring shared by every subcommand: a `Forwarder` plus the channel its
//! registered QUIC faces post inbound packets onto.
//!
//! QUIC connections themselves are handled by background tokio tasks inside
//! `ndnlt-transport`; everything here runs synchronously on the calling
//! thread, draining that channel and driving the forwarder's housekeeping.
//! This mirrors the split the forwarder crate documents: nothing in the
//! core tables is `Send`, so one thread owns them and async I/O only ever
//! talks to them through a channel.

use anyhow::{Context, Result};
use bytes::Bytes;
use ndnlt_common::clock::{SystemClock, XorShiftRng};
use ndnlt_common::name::Name;
use ndnlt_forwarder::config::ForwarderConfig;
use ndnlt_forwarder::Forwarder;
use ndnlt_transport::{bind_face_id, PendingFace};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

pub struct Node {
    pub forwarder: Forwarder<SystemClock>,
    pub rng: XorShiftRng,
    inbound_rx: mpsc::Receiver<(u16, Bytes)>,
}

impl Node {
    pub fn new(config: ForwarderConfig) -> (Self, mpsc::Sender<(u16, Bytes)>) {
        let (tx, rx) = mpsc::channel();
        let node = Self {
            forwarder: Forwarder::new(config, SystemClock),
            rng: XorShiftRng::from_time(),
            inbound_rx: rx,
        };
        (node, tx)
    }

    /// Hands a freshly connected or accepted QUIC face to the forwarder and
    /// binds its background tasks to the id it was assigned.
    pub fn register(&mut self, pending: PendingFace) -> Result<(u16, SocketAddr)> {
        let PendingFace { face, face_id_cell, remote } = pending;
        let face_id = self
            .forwarder
            .register_face(Box::new(face))
            .context("face table is full")?;
        bind_face_id(&face_id_cell, face_id);
        Ok((face_id, remote))
    }

    /// Routes every name through `face_id` — the default for a CLI that
    /// talks to exactly one peer per connection.
    pub fn route_everything_through(&mut self, face_id: u16) -> Result<()> {
        self.forwarder.add_route(face_id, &Name::new())?;
        Ok(())
    }

    /// Waits up to `timeout` for one inbound packet, feeds it to the
    /// forwarder if one arrived, then runs periodic housekeeping
    /// (PIT expiry, queued retransmissions).
    pub fn step(&mut self, timeout: Duration) {
        if let Ok((face_id, packet)) = self.inbound_rx.recv_timeout(timeout) {
            if let Err(e) = self.forwarder.receive(face_id, &packet) {
                log::warn!("dropping packet from face {face_id}: {e}");
            }
        }
        self.forwarder.process_expired_interests();
        self.forwarder.process_queue();
    }
}
