//! The list screen controller.
//!
//! `ListController` wires one list view together: debounced search text and
//! filters form a `QueryKey`, the `QueryBinding` keeps rows and pagination in
//! sync with it, push notifications trigger background refetches, and a
//! `SelectionSet` tracks checked rows for bulk actions.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::api::ListSource;
use crate::config::ListDefaults;
use crate::notify::Notifier;
use crate::realtime::{PushChannel, RealtimeInvalidator, WatchSpec};
use crate::types::{CurrentUser, NOTIFICATION_EVENT, Resource, Row};

use super::debounce::Debouncer;
use super::pagination::PaginationState;
use super::query::{BindingStatus, QueryBinding, QueryKey};
use super::selection::SelectionSet;

type RowId<S> = <<S as ListSource>::Row as Row>::Id;

/// Collaborators injected into every controller.
#[derive(Clone)]
pub struct ListContext {
    pub user: CurrentUser,
    pub channel: PushChannel,
    pub notifier: Arc<dyn Notifier>,
}

impl ListContext {
    pub fn new(user: CurrentUser, channel: PushChannel, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            user,
            channel,
            notifier,
        }
    }
}

/// Per-screen tuning.
#[derive(Debug, Clone)]
pub struct ListSettings {
    pub per_page: u32,
    pub search_debounce: Duration,
    pub scroll_threshold: u32,
    /// Filter key that carries the active tab.
    pub tab_filter: String,
    pub watches: Vec<WatchSpec>,
}

impl Default for ListSettings {
    fn default() -> Self {
        let defaults = ListDefaults::default();
        Self {
            per_page: defaults.per_page,
            search_debounce: defaults.search_debounce(),
            scroll_threshold: defaults.scroll_threshold,
            tab_filter: "status".to_string(),
            watches: Vec::new(),
        }
    }
}

impl ListSettings {
    /// Settings for one of the portal's list screens.
    pub fn for_resource(resource: Resource, defaults: &ListDefaults) -> Self {
        Self {
            per_page: defaults.per_page,
            search_debounce: defaults.search_debounce(),
            scroll_threshold: defaults.scroll_threshold,
            tab_filter: resource.tab_filter().to_string(),
            watches: vec![WatchSpec::new(
                NOTIFICATION_EVENT,
                resource.event_types().iter().copied(),
            )],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// Not mounted yet.
    Idle,
    Loading,
    /// Loaded, but nothing matches.
    Empty,
    Ready,
    /// The last fetch failed; the rows shown are the last good ones.
    Failed,
}

/// Everything a view needs to render the list.
#[derive(Debug, Clone)]
pub struct ListView<R: Row> {
    pub rows: Vec<R>,
    pub pagination: PaginationState,
    pub status: ViewStatus,
    pub selection: Vec<R::Id>,
    pub search: String,
    pub filters: BTreeMap<String, Option<String>>,
    pub fetching: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
}

struct ControllerState<Id> {
    key: QueryKey,
    search_text: String,
    selection: SelectionSet<Id>,
    mounted: bool,
}

struct Shared<S: ListSource> {
    state: Mutex<ControllerState<RowId<S>>>,
    binding: QueryBinding<S>,
}

impl<S: ListSource> Shared<S> {
    /// Change the key and, while mounted, bind it.
    ///
    /// The controller lock is held across `bind` so concurrent updates bind
    /// in the order they were made.
    fn with_key<T>(&self, f: impl FnOnce(&mut QueryKey, &QueryBinding<S>) -> T) -> T {
        let mut state = self.state.lock();
        let value = f(&mut state.key, &self.binding);
        if state.mounted {
            self.binding.bind(state.key.clone());
        }
        value
    }

    /// Apply search text delivered by the debouncer. Ignored once unmounted.
    fn settle_search(&self, text: &str) {
        let mut state = self.state.lock();
        if !state.mounted {
            return;
        }
        tracing::debug!(search = text, "search settled");
        apply_search(&mut state.key, &self.binding, text);
        self.binding.bind(state.key.clone());
    }
}

fn apply_search<S: ListSource>(key: &mut QueryKey, binding: &QueryBinding<S>, text: &str) {
    binding.update_pagination(PaginationState::reset_page);
    key.set_search(text);
    key.page = 1;
}

pub struct ListController<S: ListSource> {
    shared: Arc<Shared<S>>,
    debouncer: Debouncer<String>,
    invalidator: RealtimeInvalidator,
    settings: ListSettings,
}

impl<S: ListSource> ListController<S> {
    pub fn new(source: Arc<S>, context: ListContext, settings: ListSettings) -> Self {
        let binding = QueryBinding::new(
            source,
            context.user,
            context.notifier,
            settings.per_page,
        );
        let shared = Arc::new(Shared {
            state: Mutex::new(ControllerState {
                key: QueryKey::new(settings.per_page),
                search_text: String::new(),
                selection: SelectionSet::new(),
                mounted: false,
            }),
            binding,
        });

        let settle = Arc::clone(&shared);
        let debouncer = Debouncer::new(settings.search_debounce, move |text: String| {
            settle.settle_search(&text);
        });
        let invalidator = RealtimeInvalidator::new(context.channel, settings.watches.clone());

        Self {
            shared,
            debouncer,
            invalidator,
            settings,
        }
    }

    pub fn settings(&self) -> &ListSettings {
        &self.settings
    }

    /// Start fetching and listening for push notifications.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if state.mounted {
                return;
            }
            state.mounted = true;
            self.shared.binding.reopen();
            self.shared.binding.bind(state.key.clone());
        }

        let binding = self.shared.binding.clone();
        self.invalidator.start(move |event| {
            if binding.refetch() {
                tracing::debug!(event_type = event.event_type.as_str(), "refetching list");
            }
        });
    }

    /// Tear down: no state changes after this returns.
    pub fn unmount(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if !state.mounted {
                return;
            }
            state.mounted = false;
            state.selection.clear();
        }
        self.debouncer.discard();
        self.invalidator.stop();
        self.shared.binding.close();
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.state.lock().mounted
    }

    /// Record typed search text; the query follows once typing pauses.
    pub fn set_search(&self, text: &str) {
        let mounted = {
            let mut state = self.shared.state.lock();
            state.search_text = text.to_string();
            state.mounted
        };
        if mounted {
            self.debouncer.push(text.to_string());
        } else {
            self.shared
                .with_key(|key, binding| apply_search(key, binding, text));
        }
    }

    /// Search immediately, skipping the debounce (e.g. on Enter).
    pub fn search_now(&self, text: &str) {
        self.debouncer.discard();
        self.shared.state.lock().search_text = text.to_string();
        self.shared
            .with_key(|key, binding| apply_search(key, binding, text));
    }

    /// Set or clear a filter. Goes back to the first page.
    pub fn set_filter(&self, key: &str, value: Option<String>) {
        self.shared.with_key(|query, binding| {
            binding.update_pagination(PaginationState::reset_page);
            query.filters.insert(key.to_string(), value);
            query.page = 1;
        });
    }

    /// Switch to another tab. `None` selects the unfiltered tab.
    pub fn switch_tab(&self, value: Option<String>) {
        self.clear_selection();
        let tab_filter = self.settings.tab_filter.clone();
        self.set_filter(&tab_filter, value);
    }

    /// Go to `page`, clamped to the known page range. Returns the page applied.
    pub fn change_page(&self, page: u32) -> u32 {
        self.shared.with_key(|key, binding| {
            let applied = binding.update_pagination(|pagination| pagination.change_page(page));
            key.page = applied;
            applied
        })
    }

    pub fn set_per_page(&self, per_page: u32) {
        let per_page = per_page.max(1);
        self.shared.with_key(|key, binding| {
            binding.update_pagination(|pagination| pagination.set_per_page(per_page));
            key.per_page = per_page;
            key.page = 1;
        });
    }

    /// Reload the current page in the background.
    pub fn refetch(&self) -> bool {
        self.is_mounted() && self.shared.binding.refetch()
    }

    pub fn toggle_selection(&self, id: RowId<S>) -> bool {
        self.shared.state.lock().selection.toggle(id)
    }

    /// Check every row on the visible page.
    pub fn select_all_visible(&self) {
        let ids: Vec<_> = self.shared.binding.rows().iter().map(|row| row.id()).collect();
        self.shared.state.lock().selection.select_all(ids);
    }

    pub fn clear_selection(&self) {
        self.shared.state.lock().selection.clear();
    }

    pub fn snapshot(&self) -> ListView<S::Row> {
        let binding = &self.shared.binding;
        let rows = binding.rows();
        let status = match binding.status() {
            BindingStatus::Idle => ViewStatus::Idle,
            BindingStatus::Loading => ViewStatus::Loading,
            BindingStatus::Failed => ViewStatus::Failed,
            BindingStatus::Ready if rows.is_empty() => ViewStatus::Empty,
            BindingStatus::Ready => ViewStatus::Ready,
        };
        let state = self.shared.state.lock();
        ListView {
            rows,
            pagination: binding.pagination(),
            status,
            selection: state.selection.ids().to_vec(),
            search: state.search_text.clone(),
            filters: state.key.filters.clone(),
            fetching: binding.is_fetching(),
            error: binding.last_error(),
        }
    }

    /// The key the controller would bind right now.
    pub fn current_key(&self) -> QueryKey {
        self.shared.state.lock().key.clone()
    }

    /// Resolves once no fetch is in flight. A search still waiting out the
    /// debounce is not awaited.
    pub async fn settled(&self) {
        self.shared.binding.settled().await;
    }

    /// Receiver that ticks on every row, pagination or status change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.binding.subscribe()
    }
}

impl<S: ListSource> Drop for ListController<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}
