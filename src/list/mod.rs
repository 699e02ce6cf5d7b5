//! List views: debounced search, pagination, infinite scroll and selection.

mod controller;
mod debounce;
mod infinite;
mod pagination;
mod query;
mod selection;

pub use controller::{ListContext, ListController, ListSettings, ListView, ViewStatus};
pub use debounce::Debouncer;
pub use infinite::{InfiniteAccumulator, InfiniteList, ScrollMetrics};
pub use pagination::PaginationState;
pub use query::{BindingStatus, QueryBinding, QueryKey};
pub use selection::SelectionSet;
