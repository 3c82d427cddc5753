use core::time::Duration;
use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::ShutdownGate;

/// How often the monitor re-checks the gate.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Background loop that signals termination once a drain has completed.
///
/// The monitor polls [`ShutdownGate::can_terminate`] every `poll_interval`.
/// When the gate is draining and no work is in flight it cancels its
/// [`CancellationToken`] and exits. Callers wait on the token to stop their
/// servers and let the process exit.
///
/// Cancelling the token from outside also stops the loop, without implying
/// that the drain completed.
pub struct TerminationMonitor {
    gate: Arc<ShutdownGate>,
    poll_interval: Duration,
    token: CancellationToken,
}

impl TerminationMonitor {
    pub fn new(gate: Arc<ShutdownGate>, poll_interval: Duration) -> Self {
        Self {
            gate,
            poll_interval,
            token: CancellationToken::new(),
        }
    }

    /// The token cancelled when the process may terminate.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs the polling loop until termination is allowed.
    pub async fn run(self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(poll_interval = ?self.poll_interval, "Termination monitor started");

        loop {
            if self.gate.can_terminate() {
                #[cfg(feature = "tracing")]
                tracing::info!("Drain complete, signalling termination");
                self.token.cancel();
                return;
            }

            tokio::select! {
                () = self.token.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Termination monitor cancelled externally");
                    return;
                }
                () = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Spawns [`Self::run`] onto the current tokio runtime and returns the
    /// termination token.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn(self) -> CancellationToken {
        let token = self.token();
        tokio::spawn(self.run());
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn idle_gate_never_terminates() {
        let gate = Arc::new(ShutdownGate::new());
        let token = TerminationMonitor::new(Arc::clone(&gate), POLL).spawn();

        sleep(Duration::from_secs(60)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn terminates_within_one_poll_of_drain() {
        let gate = Arc::new(ShutdownGate::new());
        let token = TerminationMonitor::new(Arc::clone(&gate), POLL).spawn();

        assert!(gate.try_admit());
        gate.request_shutdown();

        sleep(Duration::from_secs(1)).await;
        assert!(!token.is_cancelled());

        gate.release();
        sleep(POLL * 2).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn already_drained_gate_terminates_immediately() {
        let gate = Arc::new(ShutdownGate::new());
        gate.request_shutdown();

        let monitor = TerminationMonitor::new(gate, POLL);
        let token = monitor.token();
        monitor.run().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancel_stops_the_loop() {
        let gate = Arc::new(ShutdownGate::new());
        let monitor = TerminationMonitor::new(Arc::clone(&gate), POLL);
        let token = monitor.token();
        let task = tokio::spawn(monitor.run());

        token.cancel();
        task.await.unwrap();
        assert!(!gate.can_terminate());
    }
}
