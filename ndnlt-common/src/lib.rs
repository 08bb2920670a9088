//! Wire types, TLV codec, name tree and message queue shared across the
//! ndn-lite-rs stack: the parts of an NDN forwarding node that don't care
//! whether they're running over QUIC, a serial link, or in a unit test.

pub mod bitset;
pub mod clock;
pub mod error;
pub mod metrics;
pub mod name;
pub mod nametree;
pub mod packet;
pub mod queue;
pub mod tlv;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
