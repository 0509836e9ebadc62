//! Connectivity flag with observer fan-out.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Callback invoked with the new value after every `mark_*` call.
pub type ConnectivityObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`ConnectivityState::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(u64);

impl Subscription {
    /// Returns the raw subscription id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Whether the backend is currently believed reachable.
///
/// Starts `up`. Each `mark_*` call stores the value and queues exactly one
/// notification per current observer, even when the value did not change.
/// Every observer owns a FIFO queue drained by its own delivery task, so
/// callbacks run off the marking thread and each observer sees calls in the
/// order they were made.
pub struct ConnectivityState {
    up: AtomicBool,
    next_id: AtomicU64,
    // Held while storing and enqueueing so the last value queued always
    // matches the flag.
    observers: Mutex<BTreeMap<u64, mpsc::UnboundedSender<bool>>>,
}

impl std::fmt::Debug for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityState")
            .field("up", &self.is_up())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityState {
    /// Creates a new state, initially up.
    #[must_use]
    pub fn new() -> Self {
        Self {
            up: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            observers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    /// Marks the backend reachable and notifies observers.
    pub fn mark_up(&self) {
        self.mark(true);
    }

    /// Marks the backend unreachable and notifies observers.
    pub fn mark_down(&self) {
        self.mark(false);
    }

    fn mark(&self, up: bool) {
        let mut observers = self.observers.lock();

        let previous = self.up.swap(up, Ordering::SeqCst);
        if previous == up {
            debug!(up, "Connectivity unchanged");
        } else {
            info!(up, "Connectivity changed");
        }

        // A closed queue means the delivery task is gone; drop the slot.
        observers.retain(|_, sender| sender.send(up).is_ok());
    }

    /// Registers an observer.
    ///
    /// Inside a tokio runtime the delivery loop is a spawned task; otherwise
    /// it runs on a dedicated thread. Panics raised by the callback are
    /// logged and do not stop later deliveries.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(observer))
    }

    /// Registers a shared observer.
    pub fn subscribe_arc(&self, observer: ConnectivityObserver) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        spawn_delivery(id, rx, observer);
        self.observers.lock().insert(id, tx);

        debug!(subscription = id, "Connectivity observer subscribed");
        Subscription(id)
    }

    /// Removes an observer. Notifications already queued are still delivered.
    ///
    /// Returns false if the subscription was unknown.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let removed = self.observers.lock().remove(&subscription.0).is_some();
        if removed {
            debug!(subscription = subscription.0, "Connectivity observer unsubscribed");
        }
        removed
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

fn deliver(id: u64, observer: &ConnectivityObserver, up: bool) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer(up))) {
        warn!(subscription = id, "Connectivity observer panicked: {:?}", e);
    }
}

fn spawn_delivery(id: u64, mut rx: mpsc::UnboundedReceiver<bool>, observer: ConnectivityObserver) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            while let Some(up) = rx.recv().await {
                deliver(id, &observer, up);
            }
        });
    } else {
        std::thread::spawn(move || {
            while let Some(up) = rx.blocking_recv() {
                deliver(id, &observer, up);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn recv(rx: &mut mpsc::UnboundedReceiver<bool>) -> bool {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("notification timed out")
            .expect("observer channel closed")
    }

    fn collecting(state: &ConnectivityState) -> (Subscription, mpsc::UnboundedReceiver<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = state.subscribe(move |up| {
            let _ = tx.send(up);
        });
        (sub, rx)
    }

    #[test]
    fn test_initially_up() {
        let state = ConnectivityState::new();
        assert!(state.is_up());
        assert_eq!(state.observer_count(), 0);
    }

    #[test]
    fn test_mark_updates_snapshot_immediately() {
        let state = ConnectivityState::new();
        state.mark_down();
        assert!(!state.is_up());
        state.mark_up();
        assert!(state.is_up());
    }

    #[tokio::test]
    async fn test_every_mark_notifies_in_order() {
        let state = ConnectivityState::new();
        let (_sub, mut rx) = collecting(&state);

        state.mark_down();
        state.mark_down();
        state.mark_up();

        assert!(!recv(&mut rx).await);
        assert!(!recv(&mut rx).await);
        assert!(recv(&mut rx).await);
    }

    #[tokio::test]
    async fn test_all_observers_notified() {
        let state = ConnectivityState::new();
        let (_a, mut rx_a) = collecting(&state);
        let (_b, mut rx_b) = collecting(&state);

        state.mark_down();

        assert!(!recv(&mut rx_a).await);
        assert!(!recv(&mut rx_b).await);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_notifications() {
        let state = ConnectivityState::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sub = state.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(state.unsubscribe(&sub));
        assert!(!state.unsubscribe(&sub));
        state.mark_down();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(state.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_observer_keeps_receiving() {
        let state = ConnectivityState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.subscribe(move |up| {
            let _ = tx.send(up);
            assert!(up, "observer rejects down");
        });

        state.mark_down();
        state.mark_up();

        assert!(!recv(&mut rx).await);
        assert!(recv(&mut rx).await);
    }

    #[test]
    fn test_delivery_without_runtime() {
        let state = ConnectivityState::new();
        let (tx, rx) = std::sync::mpsc::channel();
        state.subscribe(move |up| {
            let _ = tx.send(up);
        });

        state.mark_down();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(false));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_marks_end_consistent() {
        let state = Arc::new(ConnectivityState::new());
        let (_sub, mut rx) = collecting(&state);

        let mut handles = Vec::new();
        for i in 0..32 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    state.mark_down();
                } else {
                    state.mark_up();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut last = None;
        for _ in 0..32 {
            last = Some(recv(&mut rx).await);
        }
        assert_eq!(last, Some(state.is_up()));
    }
}
