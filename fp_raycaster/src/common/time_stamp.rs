use std::sync::atomic::{AtomicU64, Ordering};

// Zero is reserved for `TimeStamp::never`
static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Modification stamp drawn from a process-wide monotonic counter.
///
/// Stamps of different objects are comparable, a cache built at stamp `b`
/// is stale when its source reports a stamp newer than `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStamp(u64);

impl TimeStamp {
    /// Fresh stamp, newer than every stamp taken before.
    pub fn now() -> TimeStamp {
        TimeStamp(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    /// Stamp older than every other stamp.
    pub fn never() -> TimeStamp {
        TimeStamp(0)
    }

    /// Mark as modified right now.
    pub fn modified(&mut self) {
        *self = TimeStamp::now();
    }

    pub fn is_never(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        TimeStamp::now()
    }
}
