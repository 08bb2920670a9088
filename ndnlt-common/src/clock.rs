//! Time and randomness seams. The forwarder core never calls
//! `SystemTime::now()` or a random number generator directly — it goes
//! through these traits, so a deterministic clock and nonce source can be
//! substituted in tests and on platforms without a wall clock.

use std::time::{Duration, Instant};

/// A source of monotonic time for PIT/CS expiry and retransmission timers.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to, for deterministic tests of
/// PIT expiry and CS freshness without real sleeps.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Instant,
}

impl TestClock {
    pub fn new() -> Self {
        Self { now: Instant::now() }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.now
    }
}

/// A source of 32-bit nonces for outgoing Interests.
pub trait Rng {
    fn next_u32(&mut self) -> u32;
}

/// A simple xorshift generator, seeded from the current time by default.
/// Good enough for nonce generation; not for anything cryptographic (key
/// and signature randomness goes through `ndnlt-security`'s `Rng` seam).
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u32,
}

impl XorShiftRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    pub fn from_time() -> Self {
        let nanos = Instant::now().elapsed().subsec_nanos();
        Self::new(nanos ^ 0x1234_5678)
    }
}

impl Rng for XorShiftRng {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_only_advances_when_told() {
        let mut clock = TestClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_millis(10));
        assert!(clock.now() > t0);
    }

    #[test]
    fn xorshift_is_deterministic_for_a_given_seed() {
        let mut a = XorShiftRng::new(42);
        let mut b = XorShiftRng::new(42);
        assert_eq!(a.next_u32(), b.next_u32());
    }
}
