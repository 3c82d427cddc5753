use core::{fmt, num::ParseIntError, str::FromStr};

use portable_atomic::{AtomicU64, Ordering};

/// Opaque identifier returned when work is submitted.
///
/// Handles are issued by a [`KeyAllocator`], are strictly increasing and are
/// never reused. The first handle issued by a fresh allocator is `1`. A handle
/// displays as a bare decimal number and parses back from one, which is how
/// clients embed it in request paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkHandle(u64);

impl WorkHandle {
    /// Returns the raw integer value of the handle.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for WorkHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WorkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkHandle {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A lock-free allocator of [`WorkHandle`]s.
///
/// The counter starts at zero and is pre-incremented, so the first handle is
/// `1`. Every call advances the counter by exactly one with a single atomic
/// `fetch_add`, meaning concurrent callers always observe distinct values and
/// no value is skipped.
///
/// ## Features
/// - `cache-padded`: pads the counter to a cache line to avoid false sharing
///   with neighbouring state.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    #[cfg(feature = "cache-padded")]
    counter: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    counter: AtomicU64,
}

impl KeyAllocator {
    /// Creates an allocator whose first issued handle is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next handle.
    pub fn next_key(&self) -> WorkHandle {
        // `fetch_add` returns the previous value; the issued key is the
        // incremented one.
        WorkHandle(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Returns the most recently issued handle value, or `0` if none has been
    /// issued yet.
    pub fn last_issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread::scope;

    #[test]
    fn first_key_is_one() {
        let keys = KeyAllocator::new();
        assert_eq!(keys.last_issued(), 0);
        assert_eq!(keys.next_key(), WorkHandle::from(1));
        assert_eq!(keys.next_key(), WorkHandle::from(2));
        assert_eq!(keys.last_issued(), 2);
    }

    #[test]
    fn concurrent_keys_are_distinct_and_gapless() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 2_000;

        let keys = KeyAllocator::new();
        let issued: Vec<Vec<WorkHandle>> = scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| s.spawn(|| (0..PER_THREAD).map(|_| keys.next_key()).collect()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let seen: HashSet<u64> = issued.iter().flatten().map(|h| h.get()).collect();
        let total = (THREADS * PER_THREAD) as u64;
        assert_eq!(seen.len() as u64, total);
        assert_eq!(seen.iter().min(), Some(&1));
        assert_eq!(seen.iter().max(), Some(&total));

        // Each thread observes its own keys in increasing order.
        for keys in &issued {
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn handle_parses_from_decimal() {
        let handle: WorkHandle = "42".parse().unwrap();
        assert_eq!(handle.get(), 42);
        assert_eq!(handle.to_string(), "42");
        assert!("4x2".parse::<WorkHandle>().is_err());
        assert!("-1".parse::<WorkHandle>().is_err());
    }
}
