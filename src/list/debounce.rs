//! Debounced propagation of rapidly changing input.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

type SettleFn<T> = Arc<dyn Fn(T) + Send + Sync>;

struct DebounceState<T> {
    generation: u64,
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
    cancelled: bool,
}

struct Shared<T> {
    state: Mutex<DebounceState<T>>,
    /// Held while `on_settle` runs so `cancel` can wait out a delivery in progress.
    delivery: Mutex<()>,
    on_settle: SettleFn<T>,
}

impl<T> Shared<T> {
    /// Deliver the pending value if `generation` is still the latest one.
    fn deliver(&self, generation: u64) {
        let _delivering = self.delivery.lock();
        let value = {
            let mut state = self.state.lock();
            if state.cancelled || state.generation != generation {
                return;
            }
            state.timer = None;
            state.pending.take()
        };
        if let Some(value) = value {
            (self.on_settle)(value);
        }
    }
}

/// Emits the latest pushed value once no newer value arrived for `delay`.
///
/// Intermediate values are dropped, not queued. After `cancel` (or drop) no
/// value is ever emitted. `on_settle` must not call `flush` or `cancel` on
/// the debouncer that invokes it.
pub struct Debouncer<T: Send + 'static> {
    delay: Duration,
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, on_settle: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            shared: Arc::new(Shared {
                state: Mutex::new(DebounceState {
                    generation: 0,
                    pending: None,
                    timer: None,
                    cancelled: false,
                }),
                delivery: Mutex::new(()),
                on_settle: Arc::new(on_settle),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the quiet period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push(&self, value: T) {
        let mut state = self.shared.state.lock();
        if state.cancelled {
            return;
        }
        state.generation += 1;
        state.pending = Some(value);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let generation = state.generation;
        let delay = self.delay;
        let shared = Arc::clone(&self.shared);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.deliver(generation);
        }));
    }

    /// Emit the pending value now instead of waiting for the timer.
    pub fn flush(&self) {
        let generation = {
            let mut state = self.shared.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation
        };
        self.shared.deliver(generation);
    }

    /// Drop the pending value without emitting it.
    pub fn discard(&self) {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        state.pending = None;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    /// Stop for good. Waits for a delivery already in progress, then
    /// guarantees that nothing is emitted afterwards.
    pub fn cancel(&self) {
        {
            let mut state = self.shared.state.lock();
            state.cancelled = true;
            state.generation += 1;
            state.pending = None;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
        drop(self.shared.delivery.lock());
    }

    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.state.lock().cancelled
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
