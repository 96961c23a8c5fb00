//! Single-shot clear timeout per area
//!
//! When the last presence sensor goes inactive, the area stays occupied and
//! a timer is armed; when it fires it requests a full state recheck through
//! the area's recheck channel. At most one timer is live at any time, and
//! re-arming requires explicit cancellation first.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// The cancellable clear-timeout handle of one area
///
/// The handle stays armed after the timer fires, until the recheck it
/// requested either observes the timeout as exceeded (and cancels it) or a
/// sensor re-activates (and cancels it).
#[derive(Debug, Default)]
pub struct ClearTimeout {
    timer: Option<JoinHandle<()>>,
}

impl ClearTimeout {
    /// Create a disarmed handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a single-shot timer requesting a recheck after `duration`
    ///
    /// Returns false without arming when a timer is already live.
    pub fn arm(&mut self, duration: Duration, recheck: mpsc::Sender<()>) -> bool {
        if self.is_armed() {
            trace!("Clear timeout already armed");
            return false;
        }

        debug!(seconds = duration.as_secs(), "Arming clear timeout");
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Receiver gone means the area is being torn down
            let _ = recheck.send(()).await;
        }));
        true
    }

    /// Disarm; safe to call when not armed
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!("Cancelling clear timeout");
            timer.abort();
        }
    }

    /// Whether a timer is currently live
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for ClearTimeout {
    // A destroyed area must never receive a late recheck
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_arm_and_fire() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timeout = ClearTimeout::new();

        assert!(!timeout.is_armed());
        assert!(timeout.arm(Duration::from_millis(10), tx));
        assert!(timeout.is_armed());

        rx.recv().await.unwrap();
        // still armed after firing; only cancel disarms
        assert!(timeout.is_armed());
    }

    #[tokio::test]
    async fn test_double_arm_rejected() {
        let (tx, _rx) = mpsc::channel(4);
        let mut timeout = ClearTimeout::new();

        assert!(timeout.arm(Duration::from_secs(60), tx.clone()));
        assert!(!timeout.arm(Duration::from_secs(60), tx));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timeout = ClearTimeout::new();

        timeout.arm(Duration::from_millis(50), tx);
        timeout.cancel();
        timeout.cancel();
        assert!(!timeout.is_armed());

        // the aborted timer never requests a recheck
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rearm_after_cancel() {
        let (tx, _rx) = mpsc::channel(4);
        let mut timeout = ClearTimeout::new();

        timeout.arm(Duration::from_secs(60), tx.clone());
        timeout.cancel();
        assert!(timeout.arm(Duration::from_secs(60), tx));
    }

    #[tokio::test]
    async fn test_drop_aborts_timer() {
        let (tx, mut rx) = mpsc::channel(4);
        {
            let mut timeout = ClearTimeout::new();
            timeout.arm(Duration::from_millis(20), tx);
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }
}
