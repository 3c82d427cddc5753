//! Admission control and drain tracking for cooperative shutdown.
//!
//! The [`ShutdownGate`] holds two pieces of state behind one lock: whether new
//! work is still accepted, and how many admitted units of work have not
//! finished yet. Admission checks the flag and bumps the counter in the same
//! critical section, so a shutdown request can never interleave between the
//! two and let a late submission through.
//!
//! ## States
//!
//! - [`GateState::Accepting`] - initial; submissions are admitted.
//! - [`GateState::Draining`] - terminal; submissions are refused while
//!   in-flight work runs to completion.

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Accepting,
    Draining,
}

#[derive(Debug)]
struct Inner {
    state: GateState,
    in_flight: u64,
}

/// Tracks the accept/drain state and the number of in-flight units of work.
#[derive(Debug)]
pub struct ShutdownGate {
    inner: Mutex<Inner>,
}

impl Default for ShutdownGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: GateState::Accepting,
                in_flight: 0,
            }),
        }
    }

    /// Admits one unit of work if the gate is still accepting.
    ///
    /// Returns `true` and increments the in-flight count in a single step, or
    /// returns `false` without touching the count once draining has begun.
    /// Every `true` must be paired with exactly one [`Self::release`].
    pub fn try_admit(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            GateState::Accepting => {
                inner.in_flight += 1;
                true
            }
            GateState::Draining => false,
        }
    }

    /// Like [`Self::try_admit`], but returns an [`Admission`] that releases the
    /// slot when dropped.
    pub fn admit(self: &Arc<Self>) -> Option<Admission> {
        self.try_admit().then(|| Admission {
            gate: Arc::clone(self),
        })
    }

    /// Marks one admitted unit of work as finished.
    pub fn release(&self) {
        let mut inner = self.inner.lock();
        debug_assert!(inner.in_flight > 0, "release without a matching admit");
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }

    /// Stops admitting new work.
    ///
    /// Idempotent. Returns `true` only for the call that moved the gate from
    /// accepting to draining.
    pub fn request_shutdown(&self) -> bool {
        let mut inner = self.inner.lock();
        let first = inner.state == GateState::Accepting;
        inner.state = GateState::Draining;
        first
    }

    /// `true` once draining has begun and no admitted work remains.
    pub fn can_terminate(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == GateState::Draining && inner.in_flight == 0
    }

    pub fn state(&self) -> GateState {
        self.inner.lock().state
    }

    pub fn in_flight(&self) -> u64 {
        self.inner.lock().in_flight
    }
}

/// An admitted slot on a [`ShutdownGate`].
///
/// Dropping the admission releases the slot, including when the task holding
/// it unwinds from a panic.
#[derive(Debug)]
#[must_use = "dropping an admission immediately releases its slot"]
pub struct Admission {
    gate: Arc<ShutdownGate>,
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::thread::scope;

    #[test]
    fn admits_until_shutdown() {
        let gate = ShutdownGate::new();
        assert_eq!(gate.state(), GateState::Accepting);
        assert!(gate.try_admit());
        assert_eq!(gate.in_flight(), 1);

        assert!(gate.request_shutdown());
        assert_eq!(gate.state(), GateState::Draining);
        assert!(!gate.try_admit());
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn request_shutdown_is_idempotent() {
        let gate = ShutdownGate::new();
        assert!(gate.request_shutdown());
        assert!(!gate.request_shutdown());
        assert!(!gate.request_shutdown());
        assert_eq!(gate.state(), GateState::Draining);
        assert!(gate.can_terminate());
    }

    #[test]
    fn terminates_only_when_draining_and_empty() {
        let gate = ShutdownGate::new();
        assert!(!gate.can_terminate());

        assert!(gate.try_admit());
        assert!(gate.try_admit());
        gate.request_shutdown();
        assert!(!gate.can_terminate());

        gate.release();
        assert!(!gate.can_terminate());
        gate.release();
        assert!(gate.can_terminate());
    }

    #[test]
    fn admission_releases_on_drop() {
        let gate = Arc::new(ShutdownGate::new());
        let first = gate.admit().expect("accepting");
        let second = gate.admit().expect("accepting");
        assert_eq!(gate.in_flight(), 2);

        gate.request_shutdown();
        assert!(gate.admit().is_none());

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        drop(second);
        assert!(gate.can_terminate());
    }

    #[test]
    fn no_admission_slips_past_a_concurrent_shutdown() {
        const THREADS: usize = 8;

        let gate = ShutdownGate::new();
        let admitted = AtomicU64::new(0);
        let admitted_after_shutdown = AtomicBool::new(false);
        let shutdown_seen = AtomicBool::new(false);

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..5_000 {
                        // Sampled before the attempt: if shutdown was already
                        // observed, the attempt must fail.
                        let was_draining = shutdown_seen.load(Ordering::SeqCst);
                        if gate.try_admit() {
                            if was_draining {
                                admitted_after_shutdown.store(true, Ordering::SeqCst);
                            }
                            admitted.fetch_add(1, Ordering::SeqCst);
                            gate.release();
                        }
                    }
                });
            }
            s.spawn(|| {
                std::thread::yield_now();
                gate.request_shutdown();
                shutdown_seen.store(true, Ordering::SeqCst);
            });
        });

        assert!(!admitted_after_shutdown.load(Ordering::SeqCst));
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.can_terminate());
        assert!(!gate.try_admit());
    }
}
