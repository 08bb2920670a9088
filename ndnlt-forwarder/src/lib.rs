//! The forwarding engine: name tree, FIB, PIT, content store and the faces
//! that connect them to the outside world.
//!
//! Everything here runs on one thread. There is no internal locking; a
//! `Forwarder` is driven by a single event loop that calls `receive` as
//! packets arrive and `process_expired_interests`/`process_queue`
//! periodically. Faces that need async I/O (QUIC, serial) live in
//! `ndnlt-transport` and hand packets across a channel into that loop.

pub mod config;
pub mod cs;
pub mod error;
pub mod face;
pub mod fib;
pub mod forwarder;
pub mod pit;

pub use config::ForwarderConfig;
pub use error::{Error, Result};
pub use face::{Face, FaceKind, FaceState, FaceTable};
pub use forwarder::Forwarder;
