//! Bridges a QUIC connection into the synchronous forwarding loop.
//!
//! `QuicFace` implements `ndnlt_forwarder::face::Face`. Its `send`/`up`/`down`
//! methods never block: they hand work to background tasks over channels,
//! since the forwarder's event loop never awaits anything. Inbound packets
//! take the reverse path: a background task accepts uni streams, reassembles
//! fragments, and posts complete packets to a `std::sync::mpsc::Sender` that
//! the event loop drains and feeds to `Forwarder::receive`.
//!
//! Each logical packet gets its own QUIC uni stream, so fragment ids only
//! need to disambiguate fragments within one stream's read buffer, not across
//! streams the way a single shared datagram channel would require.

use crate::fragmentation::{self, Assembler};
use bytes::Bytes;
use ndnlt_common::nametree::INVALID_ID;
use ndnlt_forwarder::error::{Error, Result};
use ndnlt_forwarder::face::{Face, FaceKind, FaceState};
use quinn::Connection;
use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use tokio::sync::mpsc as tokio_mpsc;

const STATE_DOWN: u8 = 0;
const STATE_UP: u8 = 1;
const STATE_DESTROYED: u8 = 2;

/// A `Face` backed by a QUIC connection.
///
/// The forwarder only hands out a face's id once `register_face` returns, but
/// the background tasks need that id to tag inbound packets as soon as they
/// start accepting streams. `face_id` is shared through an atomic cell,
/// initialized to `INVALID_ID` at `spawn` time and filled in by the caller
/// right after registration (see `NdnQuicServer`/`NdnQuicClient::adopt`).
pub struct QuicFace {
    face_id: Arc<AtomicU16>,
    outbound: tokio_mpsc::UnboundedSender<Bytes>,
    state: Arc<AtomicU8>,
    kind: FaceKind,
}

impl QuicFace {
    /// Spawns the reader and writer tasks for `connection` and returns a
    /// `Face` ready to register, plus the shared id cell to fill in once
    /// registration assigns a real id.
    pub fn spawn(
        connection: Connection,
        kind: FaceKind,
        mtu: usize,
        inbound: mpsc::Sender<(u16, Bytes)>,
    ) -> (Self, Arc<AtomicU16>) {
        let (outbound_tx, outbound_rx) = tokio_mpsc::unbounded_channel::<Bytes>();
        let state = Arc::new(AtomicU8::new(STATE_DOWN));
        let face_id = Arc::new(AtomicU16::new(INVALID_ID));

        tokio::spawn(write_loop(connection.clone(), outbound_rx, mtu, Arc::clone(&state)));
        tokio::spawn(accept_loop(connection, Arc::clone(&face_id), inbound, Arc::clone(&state)));

        (
            Self {
                face_id: Arc::clone(&face_id),
                outbound: outbound_tx,
                state,
                kind,
            },
            face_id,
        )
    }
}

async fn write_loop(
    connection: Connection,
    mut outbound_rx: tokio_mpsc::UnboundedReceiver<Bytes>,
    mtu: usize,
    state: Arc<AtomicU8>,
) {
    let mut next_id: u16 = 0;
    while let Some(packet) = outbound_rx.recv().await {
        if state.load(Ordering::Acquire) == STATE_DESTROYED {
            break;
        }
        let frag_id = next_id;
        next_id = next_id.wrapping_add(1);

        let fragments: Vec<Bytes> = match fragmentation::fragment(packet, mtu, frag_id) {
            Ok(f) => f.collect(),
            Err(e) => {
                log::warn!("dropping packet that can't be fragmented at mtu {mtu}: {e}");
                continue;
            }
        };

        match connection.open_uni().await {
            Ok(mut send) => {
                for frame in &fragments {
                    if let Err(e) = send.write_all(frame).await {
                        log::warn!("quic write failed: {e}");
                        break;
                    }
                }
                if let Err(e) = send.finish() {
                    log::debug!("quic stream finish failed: {e}");
                }
            }
            Err(e) => log::warn!("quic open_uni failed: {e}"),
        }
    }
}

async fn accept_loop(
    connection: Connection,
    face_id: Arc<AtomicU16>,
    inbound: mpsc::Sender<(u16, Bytes)>,
    state: Arc<AtomicU8>,
) {
    loop {
        match connection.accept_uni().await {
            Ok(recv) => {
                tokio::spawn(read_stream(recv, Arc::clone(&face_id), inbound.clone()));
            }
            Err(e) => {
                log::debug!("quic connection closed: {e}");
                state.store(STATE_DESTROYED, Ordering::Release);
                break;
            }
        }
    }
}

async fn read_stream(mut recv: quinn::RecvStream, face_id: Arc<AtomicU16>, inbound: mpsc::Sender<(u16, Bytes)>) {
    let mut assembler = Assembler::new();
    let mut chunk = [0u8; 1200];
    loop {
        match recv.read(&mut chunk).await {
            Ok(Some(n)) if n > 0 => match assembler.feed(&chunk[..n]) {
                Ok(Some(packet)) => {
                    let _ = inbound.send((face_id.load(Ordering::Acquire), packet));
                    return;
                }
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("fragment reassembly failed: {e}");
                    return;
                }
            },
            Ok(_) => return,
            Err(e) => {
                log::debug!("quic stream read failed: {e}");
                return;
            }
        }
    }
}

impl Face for QuicFace {
    fn up(&mut self) -> Result<()> {
        self.state.store(STATE_UP, Ordering::Release);
        Ok(())
    }

    fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.outbound
            .send(Bytes::copy_from_slice(packet))
            .map_err(|_| Error::FaceDown(self.face_id.load(Ordering::Acquire)))
    }

    fn down(&mut self) -> Result<()> {
        self.state.store(STATE_DOWN, Ordering::Release);
        Ok(())
    }

    fn state(&self) -> FaceState {
        match self.state.load(Ordering::Acquire) {
            STATE_UP => FaceState::Up,
            STATE_DESTROYED => FaceState::Destroyed,
            _ => FaceState::Down,
        }
    }

    fn kind(&self) -> FaceKind {
        self.kind
    }
}
