pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod list;
pub mod logging;
pub mod notify;
pub mod realtime;
pub mod types;

pub use api::{HttpListSource, ListSource, PageMeta, PageRequest, PageResponse};
pub use config::Config;
pub use error::{PortalError, Result};
pub use list::{
    InfiniteAccumulator, InfiniteList, ListContext, ListController, ListSettings, ListView,
    PaginationState, QueryKey, ScrollMetrics, SelectionSet, ViewStatus,
};
pub use notify::{Notifier, TerminalNotifier, Toast, ToastLevel, ToastQueue};
pub use realtime::{PushChannel, PushEvent, RealtimeInvalidator, WatchSpec};
pub use types::{CurrentUser, Record, RecordId, Resource, Row};
