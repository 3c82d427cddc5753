//! Submission, background processing and retrieval of digests.
//!
//! A [`Pipeline`] ties the leaf components together:
//!
//! - [`ShutdownGate`] decides whether a submission is admitted.
//! - [`KeyAllocator`] issues the handle returned to the caller.
//! - A spawned task waits the configured work delay, runs the [`Compute`]
//!   collaborator and stores the digest in the [`ResultStore`].
//! - [`StatsAggregator`] records how long the compute step took.
//!
//! The handle is returned as soon as the task is spawned, so a caller that
//! fetches immediately observes [`Error::NotFound`] until the work has
//! finished.

use core::time::Duration;
use std::{sync::Arc, time::Instant};

use crate::{
    Admission, Compute, Error, KeyAllocator, Result, ResultStore, Sha512Base64, ShutdownGate,
    StatsAggregator, StatsSnapshot, WorkHandle,
};

/// Delay applied to every unit of work before the digest is computed.
pub const DEFAULT_WORK_DELAY: Duration = Duration::from_secs(5);

/// Asynchronous digest pipeline.
///
/// Cloning a pipeline is cheap; clones share the same handle counter, result
/// store, statistics and gate.
pub struct Pipeline<C = Sha512Base64> {
    keys: Arc<KeyAllocator>,
    results: Arc<ResultStore>,
    stats: Arc<StatsAggregator>,
    gate: Arc<ShutdownGate>,
    compute: Arc<C>,
    work_delay: Duration,
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            results: Arc::clone(&self.results),
            stats: Arc::clone(&self.stats),
            gate: Arc::clone(&self.gate),
            compute: Arc::clone(&self.compute),
            work_delay: self.work_delay,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DELAY)
    }
}

impl Pipeline {
    /// Creates a SHA-512 pipeline that waits `work_delay` before each digest.
    pub fn new(work_delay: Duration) -> Self {
        Self::with_compute(Sha512Base64, work_delay)
    }
}

impl<C> Pipeline<C>
where
    C: Compute,
{
    /// Creates a pipeline around a custom [`Compute`] implementation.
    pub fn with_compute(compute: C, work_delay: Duration) -> Self {
        Self {
            keys: Arc::new(KeyAllocator::new()),
            results: Arc::new(ResultStore::new()),
            stats: Arc::new(StatsAggregator::new()),
            gate: Arc::new(ShutdownGate::new()),
            compute: Arc::new(compute),
            work_delay,
        }
    }

    /// Submits `input` for asynchronous processing and returns its handle.
    ///
    /// The admission check happens before the input is validated, so a
    /// draining pipeline rejects even malformed submissions.
    ///
    /// # Errors
    ///
    /// - [`Error::Rejected`] once shutdown has been requested.
    /// - [`Error::InvalidInput`] if `input` is empty.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn submit(&self, input: impl Into<String>) -> Result<WorkHandle> {
        let Some(admission) = self.gate.admit() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Rejecting submission, shutdown underway");
            return Err(Error::Rejected);
        };

        let input = input.into();
        if input.is_empty() {
            // Releases the slot taken above.
            drop(admission);
            return Err(Error::InvalidInput {
                reason: "malformed post data".to_string(),
            });
        }

        let handle = self.keys.next_key();
        let job = Job {
            handle,
            input,
            admission,
            results: Arc::clone(&self.results),
            stats: Arc::clone(&self.stats),
            compute: Arc::clone(&self.compute),
            work_delay: self.work_delay,
        };

        let fut = job.run();
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            fut.instrument(tracing::debug_span!("job", %handle))
        };
        tokio::spawn(fut);

        #[cfg(feature = "tracing")]
        tracing::debug!(%handle, "Accepted submission");
        Ok(handle)
    }

    /// Returns the digest stored for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the handle is unknown or its work has
    /// not completed yet.
    pub fn fetch(&self, handle: WorkHandle) -> Result<String> {
        self.results.get(handle)
    }

    /// Stops admitting new work. In-flight work keeps running.
    ///
    /// Idempotent; returns `true` only for the call that started the drain.
    pub fn request_shutdown(&self) -> bool {
        let first = self.gate.request_shutdown();

        #[cfg(feature = "tracing")]
        if first {
            tracing::info!(in_flight = self.gate.in_flight(), "Shutdown requested, draining");
        }

        first
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The gate shared by every clone of this pipeline.
    pub fn gate(&self) -> Arc<ShutdownGate> {
        Arc::clone(&self.gate)
    }

    pub fn work_delay(&self) -> Duration {
        self.work_delay
    }
}

/// One admitted unit of work, owned by its background task.
struct Job<C> {
    handle: WorkHandle,
    input: String,
    admission: Admission,
    results: Arc<ResultStore>,
    stats: Arc<StatsAggregator>,
    compute: Arc<C>,
    work_delay: Duration,
}

impl<C> Job<C>
where
    C: Compute,
{
    async fn run(self) {
        tokio::time::sleep(self.work_delay).await;

        // Only the compute step is timed; the delay above is excluded.
        let start = Instant::now();
        let digest = self.compute.compute(&self.input);
        let elapsed = start.elapsed();

        self.results.put(self.handle, digest);
        self.stats.record(elapsed);

        #[cfg(feature = "tracing")]
        tracing::trace!(elapsed_ns = crate::stats::saturating_nanos(elapsed), "Digest stored");

        // Released last so a drained gate implies every result is visible.
        drop(self.admission);
    }
}
