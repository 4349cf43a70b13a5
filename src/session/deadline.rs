use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Deferred event posted back to the controller unless cancelled first.
///
/// Armed on entry to a timeout-guarded state and cancelled on exit. Arming
/// again replaces the pending event; cancelling twice is a no-op.
#[derive(Debug)]
pub struct Deadline {
    handle: Option<JoinHandle<()>>,
}

impl Deadline {
    pub fn new() -> Self {
        Self { handle: None }
    }

    pub fn arm<E>(&mut self, after: Duration, event: E, tx: mpsc::UnboundedSender<E>)
    where
        E: Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(event);
        }));
    }

    /// Returns true if a pending event was withdrawn
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut deadline = Deadline::new();
        deadline.arm(Duration::from_secs(10), "expired", tx);

        assert!(deadline.is_armed());
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(rx.recv().await, Some("expired"));
        assert!(!deadline.is_armed());
        assert!(!deadline.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (tx, mut rx) = mpsc::unbounded_channel::<&str>();
        let mut deadline = Deadline::new();
        deadline.arm(Duration::from_secs(10), "expired", tx);

        assert!(deadline.cancel());
        assert!(!deadline.cancel());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut deadline = Deadline::new();
        deadline.arm(Duration::from_secs(5), 1, tx.clone());
        deadline.arm(Duration::from_secs(5), 2, tx);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.recv().await, Some(2));
        assert!(rx.try_recv().is_err());
    }
}
