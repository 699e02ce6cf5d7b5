//! Binding between a query key and the rows fetched for it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::api::{ListSource, PageRequest, PageResponse};
use crate::error::Result;
use crate::notify::Notifier;
use crate::types::CurrentUser;

use super::pagination::PaginationState;

/// Everything that identifies one version of a list request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub search: Option<String>,
    pub filters: BTreeMap<String, Option<String>>,
    pub page: u32,
    pub per_page: u32,
}

impl QueryKey {
    pub fn new(per_page: u32) -> Self {
        Self {
            search: None,
            filters: BTreeMap::new(),
            page: 1,
            per_page: per_page.max(1),
        }
    }

    /// Set the search text. Blank text clears the search.
    pub fn with_search(mut self, text: &str) -> Self {
        self.set_search(text);
        self
    }

    pub fn set_search(&mut self, text: &str) {
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.filters.insert(key.into(), value);
        self
    }

    pub fn to_request(&self) -> PageRequest {
        let mut request = PageRequest::new(self.page, self.per_page);
        request.search = self.search.clone();
        request.filters = self.filters.clone();
        request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStatus {
    /// No key bound yet.
    Idle,
    /// A fresh load for the current key is in flight.
    Loading,
    Ready,
    /// The last fetch failed; rows and pagination are the last good values.
    Failed,
}

struct InFlight {
    generation: u64,
    refetching: bool,
    handle: AbortHandle,
}

struct BindingState<R> {
    key: Option<QueryKey>,
    generation: u64,
    in_flight: Option<InFlight>,
    rows: Vec<R>,
    pagination: PaginationState,
    status: BindingStatus,
    last_error: Option<String>,
    /// A refetch was requested while a fetch was in flight; that fetch may
    /// have been answered before the change, so one more refetch follows it.
    stale: bool,
    closed: bool,
}

struct Inner<S: ListSource> {
    source: Arc<S>,
    user: CurrentUser,
    notifier: Arc<dyn Notifier>,
    state: Mutex<BindingState<S::Row>>,
    revision: watch::Sender<u64>,
}

impl<S: ListSource> Inner<S> {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn start_fetch(
        self: &Arc<Self>,
        state: &mut BindingState<S::Row>,
        key: &QueryKey,
        refetching: bool,
    ) {
        if let Some(previous) = state.in_flight.take() {
            tracing::debug!(generation = previous.generation, "aborting superseded fetch");
            previous.handle.abort();
        }
        state.generation += 1;
        state.stale = false;
        if !refetching {
            state.status = BindingStatus::Loading;
        }

        let generation = state.generation;
        let request = key.to_request();
        tracing::debug!(generation, page = request.page, refetching, "starting list fetch");

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = inner.source.fetch_page(&inner.user, request).await;
            inner.complete(generation, result);
        });
        state.in_flight = Some(InFlight {
            generation,
            refetching,
            handle: task.abort_handle(),
        });
    }

    fn complete(self: &Arc<Self>, generation: u64, result: Result<PageResponse<S::Row>>) {
        let failure = {
            let mut state = self.state.lock();
            if state.closed || state.generation != generation {
                tracing::debug!(generation, latest = state.generation, "discarding stale list response");
                return;
            }
            let refetching = state
                .in_flight
                .take()
                .is_some_and(|in_flight| in_flight.refetching);

            match result.and_then(|page| page.validate().map(|()| page)) {
                Ok(page) => {
                    tracing::debug!(
                        generation,
                        rows = page.items.len(),
                        total = page.meta.total_items,
                        refetching,
                        "list page loaded"
                    );
                    state.pagination.apply_server_meta(&page.meta, refetching);
                    state.rows = page.items;
                    state.status = BindingStatus::Ready;
                    state.last_error = None;
                    if std::mem::take(&mut state.stale) {
                        if let Some(key) = state.key.clone() {
                            tracing::debug!(generation, "refetching rows invalidated mid-flight");
                            self.start_fetch(&mut state, &key, true);
                        }
                    }
                    None
                }
                Err(err) => {
                    state.stale = false;
                    state.status = BindingStatus::Failed;
                    state.last_error = Some(err.to_string());
                    Some(err)
                }
            }
        };

        self.bump();
        if let Some(err) = failure {
            tracing::warn!(error = %err, generation, "list fetch failed");
            self.notifier.error(&err.toast_message());
        }
    }
}

/// Keeps the visible rows in sync with the bound `QueryKey`.
///
/// Every fetch carries a generation; only the response of the latest
/// generation is applied. Cloning yields another handle to the same binding.
pub struct QueryBinding<S: ListSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ListSource> Clone for QueryBinding<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ListSource> QueryBinding<S> {
    pub fn new(
        source: Arc<S>,
        user: CurrentUser,
        notifier: Arc<dyn Notifier>,
        per_page: u32,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                source,
                user,
                notifier,
                state: Mutex::new(BindingState {
                    key: None,
                    generation: 0,
                    in_flight: None,
                    rows: Vec::new(),
                    pagination: PaginationState::new(per_page),
                    status: BindingStatus::Idle,
                    last_error: None,
                    stale: false,
                    closed: false,
                }),
                revision,
            }),
        }
    }

    /// Bind `key`, fetching it unless it is already the bound key.
    ///
    /// A superseded in-flight fetch is aborted. Returns whether a fetch was
    /// started. Must be called from within a tokio runtime.
    pub fn bind(&self, key: QueryKey) -> bool {
        let mut state = self.inner.state.lock();
        if state.closed || state.key.as_ref() == Some(&key) {
            return false;
        }
        state.key = Some(key.clone());
        self.inner.start_fetch(&mut state, &key, false);
        drop(state);
        self.inner.bump();
        true
    }

    /// Re-run the bound key in the background.
    ///
    /// While a fetch is in flight the request is queued instead: once that
    /// fetch lands, exactly one refetch follows, however many requests
    /// arrived meanwhile. A refetch replaces the rows but never touches
    /// pagination. Returns whether a fetch was started right away.
    pub fn refetch(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.closed {
            return false;
        }
        if state.in_flight.is_some() {
            state.stale = true;
            return false;
        }
        let Some(key) = state.key.clone() else {
            return false;
        };
        self.inner.start_fetch(&mut state, &key, true);
        drop(state);
        self.inner.bump();
        true
    }

    /// Mutate the pagination state, e.g. to clamp a requested page.
    pub fn update_pagination<T>(&self, f: impl FnOnce(&mut PaginationState) -> T) -> T {
        let value = f(&mut self.inner.state.lock().pagination);
        self.inner.bump();
        value
    }

    /// Abort any fetch in flight and ignore every response from now on.
    pub fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.stale = false;
            state.generation += 1;
            if let Some(in_flight) = state.in_flight.take() {
                in_flight.handle.abort();
            }
        }
        self.inner.bump();
    }

    /// Accept responses again after `close`. The next `bind` always fetches.
    pub fn reopen(&self) {
        let mut state = self.inner.state.lock();
        state.closed = false;
        state.key = None;
    }

    /// Resolves once no fetch is in flight.
    pub async fn settled(&self) {
        let mut revisions = self.inner.revision.subscribe();
        while self.is_fetching() {
            if revisions.changed().await.is_err() {
                return;
            }
        }
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn key(&self) -> Option<QueryKey> {
        self.inner.state.lock().key.clone()
    }

    pub fn rows(&self) -> Vec<S::Row> {
        self.inner.state.lock().rows.clone()
    }

    pub fn pagination(&self) -> PaginationState {
        self.inner.state.lock().pagination
    }

    pub fn status(&self) -> BindingStatus {
        self.inner.state.lock().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }
}
