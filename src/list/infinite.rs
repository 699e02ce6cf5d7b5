//! Infinite scrolling: pages accumulated into one growing list.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::api::{ListSource, PageMeta, PageResponse};
use crate::error::Result;
use crate::notify::Notifier;
use crate::realtime::{PushChannel, RealtimeInvalidator, WatchSpec};
use crate::types::CurrentUser;

use super::query::QueryKey;

/// Pages fetched so far, in fetch order.
#[derive(Debug, Clone)]
pub struct InfiniteAccumulator<R> {
    pages: Vec<PageResponse<R>>,
}

impl<R> Default for InfiniteAccumulator<R> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<R: Clone> InfiniteAccumulator<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, page: PageResponse<R>) {
        self.pages.push(page);
    }

    /// All rows, flattened in the order their pages were fetched.
    pub fn rows(&self) -> Vec<R> {
        self.pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }

    /// Page to request next: `Some(1)` before anything was fetched, the page
    /// after the last appended one while more exist, `None` at the end.
    ///
    /// Only the last appended page is consulted.
    pub fn next_page_param(&self) -> Option<u32> {
        match self.pages.last() {
            None => Some(1),
            Some(page) if page.meta.current_page < page.meta.total_pages => {
                Some(page.meta.current_page + 1)
            }
            Some(_) => None,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_param().is_some()
    }

    pub fn last_meta(&self) -> Option<&PageMeta> {
        self.pages.last().map(|page| &page.meta)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Swap in freshly fetched pages for the ones accumulated so far.
    pub fn replace(&mut self, pages: Vec<PageResponse<R>>) {
        self.pages = pages;
    }

    pub fn reset(&mut self) {
        self.pages.clear();
    }
}

/// Scroll position of the list container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub client_height: f64,
    pub scroll_top: f64,
    pub scroll_height: f64,
}

impl ScrollMetrics {
    pub fn new(client_height: f64, scroll_top: f64, scroll_height: f64) -> Self {
        Self {
            client_height,
            scroll_top,
            scroll_height,
        }
    }

    /// Whether the viewport is within `threshold` pixels of the bottom.
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.client_height + self.scroll_top >= self.scroll_height - threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Load {
    /// The page after the last accumulated one.
    NextPage(u32),
    /// Pages `1..=n` again, replacing what is accumulated.
    Refetch(u32),
}

impl Load {
    fn pages(self) -> std::ops::RangeInclusive<u32> {
        match self {
            Load::NextPage(page) => page..=page,
            Load::Refetch(count) => 1..=count,
        }
    }
}

struct InfiniteState<R> {
    key: QueryKey,
    generation: u64,
    accumulator: InfiniteAccumulator<R>,
    in_flight: Option<AbortHandle>,
    last_error: Option<String>,
    /// A refetch was requested while a load was in flight.
    stale: bool,
    closed: bool,
}

struct InfiniteInner<S: ListSource> {
    source: Arc<S>,
    user: CurrentUser,
    notifier: Arc<dyn Notifier>,
    threshold: f64,
    state: Mutex<InfiniteState<S::Row>>,
    invalidator: Mutex<Option<RealtimeInvalidator>>,
    revision: watch::Sender<u64>,
}

impl<S: ListSource> InfiniteInner<S> {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Spawn `load` for the current key. The task only holds a weak handle,
    /// so dropping the last `InfiniteList` still cancels it.
    fn start_load(self: &Arc<Self>, state: &mut InfiniteState<S::Row>, load: Load) {
        state.stale = false;
        let generation = state.generation;
        let key = state.key.clone();
        tracing::debug!(generation, ?load, "loading pages");

        let source = Arc::clone(&self.source);
        let user = self.user.clone();
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut pages = Vec::new();
            let mut result = Ok(());
            for page in load.pages() {
                let mut request = key.clone();
                request.page = page;
                match source.fetch_page(&user, request.to_request()).await {
                    Ok(response) => pages.push(response),
                    Err(err) => {
                        result = Err(err);
                        break;
                    }
                }
            }
            if let Some(inner) = weak.upgrade() {
                inner.complete(generation, load, result.map(|()| pages));
            }
        });
        state.in_flight = Some(task.abort_handle());
    }

    fn complete(
        self: &Arc<Self>,
        generation: u64,
        load: Load,
        result: Result<Vec<PageResponse<S::Row>>>,
    ) {
        let failure = {
            let mut state = self.state.lock();
            if state.closed || state.generation != generation {
                tracing::debug!(generation, ?load, "discarding pages of a previous search");
                return;
            }
            state.in_flight = None;
            let validated = result.and_then(|pages| {
                pages.iter().try_for_each(PageResponse::validate)?;
                Ok(pages)
            });
            match validated {
                Ok(pages) => {
                    let rows: usize = pages.iter().map(|page| page.items.len()).sum();
                    tracing::debug!(?load, rows, "pages loaded");
                    match load {
                        Load::NextPage(_) => {
                            for page in pages {
                                state.accumulator.append(page);
                            }
                        }
                        Load::Refetch(_) => state.accumulator.replace(pages),
                    }
                    state.last_error = None;
                    if state.stale {
                        let count = state.accumulator.page_count() as u32;
                        if count > 0 {
                            tracing::debug!(generation, "refetching pages invalidated mid-flight");
                            self.start_load(&mut state, Load::Refetch(count));
                        }
                        state.stale = false;
                    }
                    None
                }
                Err(err) => {
                    state.stale = false;
                    state.last_error = Some(err.to_string());
                    Some(err)
                }
            }
        };

        self.bump();
        if let Some(err) = failure {
            tracing::warn!(error = %err, ?load, "loading pages failed");
            self.notifier.error(&err.toast_message());
        }
    }
}

impl<S: ListSource> Drop for InfiniteInner<S> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.state.get_mut().in_flight.take() {
            in_flight.abort();
        }
    }
}

/// Drives an `InfiniteAccumulator` from scroll events.
///
/// Cloning yields another handle to the same list. Dropping the last handle
/// stops listening for push events and aborts the load in flight.
pub struct InfiniteList<S: ListSource> {
    inner: Arc<InfiniteInner<S>>,
}

impl<S: ListSource> Clone for InfiniteList<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ListSource> InfiniteList<S> {
    pub fn new(
        source: Arc<S>,
        user: CurrentUser,
        notifier: Arc<dyn Notifier>,
        key: QueryKey,
        threshold: u32,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(InfiniteInner {
                source,
                user,
                notifier,
                threshold: f64::from(threshold),
                state: Mutex::new(InfiniteState {
                    key,
                    generation: 0,
                    accumulator: InfiniteAccumulator::new(),
                    in_flight: None,
                    last_error: None,
                    stale: false,
                    closed: false,
                }),
                invalidator: Mutex::new(None),
                revision,
            }),
        }
    }

    /// Evaluate a scroll position. Starts loading the next page when the
    /// viewport is near the bottom, nothing is loading and more pages exist.
    ///
    /// Returns whether a fetch was started.
    pub fn on_scroll(&self, metrics: ScrollMetrics) -> bool {
        if !metrics.is_near_bottom(self.inner.threshold) {
            return false;
        }
        self.fetch_next_page()
    }

    /// Load the next page unless one is already loading or none is left.
    pub fn fetch_next_page(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.closed || state.in_flight.is_some() {
            return false;
        }
        let Some(page) = state.accumulator.next_page_param() else {
            return false;
        };
        self.inner.start_load(&mut state, Load::NextPage(page));
        drop(state);
        self.inner.bump();
        true
    }

    /// Reload every accumulated page in the background.
    ///
    /// Pages stay visible until the fresh ones land; the next-page cursor
    /// keeps its position. While a load is in flight the refetch is queued
    /// and runs once after it. Returns whether a load was started right away.
    pub fn refetch(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.closed {
            return false;
        }
        if state.in_flight.is_some() {
            state.stale = true;
            return false;
        }
        let count = state.accumulator.page_count() as u32;
        if count == 0 {
            return false;
        }
        self.inner.start_load(&mut state, Load::Refetch(count));
        drop(state);
        self.inner.bump();
        true
    }

    /// Refetch whenever a push event matching `watches` arrives on `channel`.
    /// Replaces listeners registered by an earlier call.
    pub fn watch(&self, channel: PushChannel, watches: Vec<WatchSpec>) {
        let mut invalidator = RealtimeInvalidator::new(channel, watches);
        let weak = Arc::downgrade(&self.inner);
        invalidator.start(move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if (InfiniteList { inner }).refetch() {
                tracing::debug!(event_type = event.event_type.as_str(), "refetching infinite list");
            }
        });
        let previous = self.inner.invalidator.lock().replace(invalidator);
        drop(previous);
    }

    /// Stop listening for push events.
    pub fn unwatch(&self) {
        let previous = self.inner.invalidator.lock().take();
        drop(previous);
    }

    pub fn is_watching(&self) -> bool {
        self.inner.invalidator.lock().is_some()
    }

    /// Start over for a new search or filter. Pages still loading for the
    /// previous key are discarded.
    pub fn reset(&self, key: QueryKey) {
        {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.stale = false;
            if let Some(in_flight) = state.in_flight.take() {
                in_flight.abort();
            }
            state.accumulator.reset();
            state.last_error = None;
            state.key = key;
        }
        self.inner.bump();
    }

    /// Abort the load in flight, stop listening and ignore every response
    /// from now on.
    pub fn close(&self) {
        self.unwatch();
        {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.stale = false;
            state.generation += 1;
            if let Some(in_flight) = state.in_flight.take() {
                in_flight.abort();
            }
        }
        self.inner.bump();
    }

    /// Resolves once no page is loading.
    pub async fn settled(&self) {
        let mut revisions = self.inner.revision.subscribe();
        while self.is_fetching() {
            if revisions.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    pub fn has_next_page(&self) -> bool {
        self.inner.state.lock().accumulator.has_next_page()
    }

    pub fn rows(&self) -> Vec<S::Row> {
        self.inner.state.lock().accumulator.rows()
    }

    pub fn page_count(&self) -> usize {
        self.inner.state.lock().accumulator.page_count()
    }

    pub fn total_items(&self) -> Option<u64> {
        self.inner
            .state
            .lock()
            .accumulator
            .last_meta()
            .map(|meta| meta.total_items)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }
}
