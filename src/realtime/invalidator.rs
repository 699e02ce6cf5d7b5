use std::collections::HashSet;
use std::sync::Arc;

use super::{ListenerId, PushChannel, PushEvent};

/// Which event `type` values a watch reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    OneOf(HashSet<String>),
}

impl TypeFilter {
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::OneOf(types) => types.contains(event_type),
        }
    }
}

/// One event name to listen on, plus the types that count as a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    pub event_name: String,
    pub types: TypeFilter,
}

impl WatchSpec {
    pub fn new<I, S>(event_name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            event_name: event_name.into(),
            types: TypeFilter::OneOf(types.into_iter().map(Into::into).collect()),
        }
    }

    pub fn any(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            types: TypeFilter::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidatorState {
    Unregistered,
    Registered,
}

/// Registers push listeners for a list view and removes exactly those
/// listeners again on `stop`.
pub struct RealtimeInvalidator {
    channel: PushChannel,
    watches: Vec<WatchSpec>,
    registered: Vec<(String, ListenerId)>,
    state: InvalidatorState,
}

impl RealtimeInvalidator {
    pub fn new(channel: PushChannel, watches: Vec<WatchSpec>) -> Self {
        Self {
            channel,
            watches,
            registered: Vec::new(),
            state: InvalidatorState::Unregistered,
        }
    }

    pub fn state(&self) -> InvalidatorState {
        self.state
    }

    pub fn watches(&self) -> &[WatchSpec] {
        &self.watches
    }

    /// Register one listener per watch. `on_match` runs for every event whose
    /// type the watch accepts. Calling `start` while registered does nothing.
    pub fn start<F>(&mut self, on_match: F)
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        if self.state == InvalidatorState::Registered {
            return;
        }
        self.state = InvalidatorState::Registered;

        let on_match: Arc<dyn Fn(&PushEvent) + Send + Sync> = Arc::new(on_match);
        for watch in &self.watches {
            let types = watch.types.clone();
            let callback = Arc::clone(&on_match);
            let event_name = watch.event_name.clone();
            let id = self.channel.on(&watch.event_name, move |event| {
                if types.matches(&event.event_type) {
                    tracing::debug!(
                        event = event_name.as_str(),
                        event_type = event.event_type.as_str(),
                        "push event invalidates list"
                    );
                    callback(event);
                }
            });
            self.registered.push((watch.event_name.clone(), id));
        }
    }

    /// Deregister the listeners added by `start`.
    pub fn stop(&mut self) {
        for (event_name, id) in self.registered.drain(..) {
            self.channel.off(&event_name, id);
        }
        self.state = InvalidatorState::Unregistered;
    }
}

impl Drop for RealtimeInvalidator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_invalidator(
        channel: &PushChannel,
        watches: Vec<WatchSpec>,
    ) -> (RealtimeInvalidator, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let mut invalidator = RealtimeInvalidator::new(channel.clone(), watches);
        let handler_count = Arc::clone(&count);
        invalidator.start(move |_| {
            handler_count.fetch_add(1, Ordering::SeqCst);
        });
        (invalidator, count)
    }

    #[test]
    fn test_matching_type_triggers_once() {
        let channel = PushChannel::new();
        let (_invalidator, count) = counting_invalidator(
            &channel,
            vec![WatchSpec::new("notification", ["product.updated"])],
        );

        channel.emit("notification", &PushEvent::new("chat.message"));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        channel.emit("notification", &PushEvent::new("product.updated"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_any_filter_matches_every_type() {
        let channel = PushChannel::new();
        let (_invalidator, count) =
            counting_invalidator(&channel, vec![WatchSpec::any("document")]);

        channel.emit("document", &PushEvent::new("whatever"));
        channel.emit("document", &PushEvent::new("else"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_state_transitions() {
        let channel = PushChannel::new();
        let mut invalidator = RealtimeInvalidator::new(
            channel.clone(),
            vec![
                WatchSpec::new("notification", ["a"]),
                WatchSpec::new("download", ["b"]),
            ],
        );
        assert_eq!(invalidator.state(), InvalidatorState::Unregistered);

        invalidator.start(|_| {});
        assert_eq!(invalidator.state(), InvalidatorState::Registered);
        assert_eq!(channel.listener_count("notification"), 1);
        assert_eq!(channel.listener_count("download"), 1);

        invalidator.start(|_| {});
        assert_eq!(
            channel.listener_count("notification"),
            1,
            "second start must not register again"
        );

        invalidator.stop();
        assert_eq!(invalidator.state(), InvalidatorState::Unregistered);
        assert_eq!(channel.listener_count("notification"), 0);
        assert_eq!(channel.listener_count("download"), 0);

        invalidator.stop();
        assert_eq!(invalidator.state(), InvalidatorState::Unregistered);
    }

    #[test]
    fn test_stop_leaves_other_subscribers() {
        let channel = PushChannel::new();
        let (mut first, first_count) = counting_invalidator(
            &channel,
            vec![WatchSpec::new("notification", ["product.updated"])],
        );
        let (_second, second_count) = counting_invalidator(
            &channel,
            vec![WatchSpec::new("notification", ["product.updated"])],
        );

        channel.emit("notification", &PushEvent::new("product.updated"));
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        first.stop();
        channel.emit("notification", &PushEvent::new("product.updated"));
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_deregisters() {
        let channel = PushChannel::new();
        {
            let _invalidator = counting_invalidator(&channel, vec![WatchSpec::any("notification")]);
            assert_eq!(channel.listener_count("notification"), 1);
        }
        assert_eq!(channel.listener_count("notification"), 0);
    }
}
