//! Fixed capacities and timing defaults for a forwarder instance. Kept as
//! plain constructor arguments rather than a global, since an application
//! may want more than one stack (e.g. a gateway bridging two faces with
//! different table sizes) in the same process.

/// Capacities and defaults sized for a constrained device: small enough to
/// fit comfortably in a few kilobytes of tables, generous enough for a
/// handful of concurrently pending Interests.
#[derive(Debug, Clone, Copy)]
pub struct ForwarderConfig {
    pub nametree_capacity: usize,
    pub face_table_capacity: usize,
    pub fib_capacity: usize,
    pub pit_capacity: usize,
    pub cs_capacity: usize,
    pub default_interest_lifetime_ms: u32,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            nametree_capacity: 64,
            face_table_capacity: 10,
            fib_capacity: 20,
            pit_capacity: 32,
            cs_capacity: 10,
            default_interest_lifetime_ms: ndnlt_common::packet::DEFAULT_INTEREST_LIFETIME_MS,
        }
    }
}
