//! Single-shot deadlines that report back into the session queue.
//!
//! A deadline is a sleeping tokio task that posts a message tagged with the
//! generation it was armed under. Rearming or cancelling bumps the
//! generation, so a message that was already queued when the deadline was
//! cancelled is recognised as stale by [`Deadline::fire`].

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub(crate) struct Deadline {
    name: &'static str,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Deadline {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            task: None,
        }
    }

    /// Cancel any pending firing and schedule a new one `delay` from now.
    pub(crate) fn arm<T, F>(&mut self, delay: Duration, tx: &UnboundedSender<T>, message: F)
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let tx = tx.clone();
        tracing::trace!(deadline = self.name, generation, ?delay, "Deadline armed");
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the session has shut down.
            let _ = tx.send(message(generation));
        }));
    }

    pub(crate) fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::trace!(deadline = self.name, "Deadline cancelled");
        }
    }

    /// Consume a firing. Returns `false` for stale or cancelled firings.
    pub(crate) fn fire(&mut self, generation: u64) -> bool {
        if self.task.is_none() || generation != self.generation {
            tracing::trace!(deadline = self.name, generation, "Stale deadline ignored");
            return false;
        }
        self.task = None;
        true
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut deadline = Deadline::new("test");
        deadline.arm(Duration::from_millis(2500), &tx, |g| g);
        assert!(deadline.is_armed());

        tokio::time::sleep(Duration::from_millis(2499)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let generation = rx.try_recv().unwrap();
        assert!(deadline.fire(generation));
        assert!(!deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut deadline = Deadline::new("test");
        deadline.arm(Duration::from_millis(100), &tx, |g| g);
        tokio::time::sleep(Duration::from_millis(60)).await;
        deadline.arm(Duration::from_millis(100), &tx, |g| g);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err(), "first arming must not fire");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let generation = rx.try_recv().unwrap();
        assert!(deadline.fire(generation));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let mut deadline = Deadline::new("test");
        deadline.arm(Duration::from_millis(200), &tx, |g| g);
        deadline.cancel();
        assert!(!deadline.is_armed());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_firing_is_stale_after_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut deadline = Deadline::new("test");
        deadline.arm(Duration::from_millis(10), &tx, |g| g);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Fired and queued, but the owner cancelled before reading it.
        let generation = rx.try_recv().unwrap();
        deadline.cancel();
        assert!(!deadline.fire(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_is_consumed_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut deadline = Deadline::new("test");
        deadline.arm(Duration::from_millis(10), &tx, |g| g);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let generation = rx.try_recv().unwrap();
        assert!(deadline.fire(generation));
        assert!(!deadline.fire(generation));
    }
}
