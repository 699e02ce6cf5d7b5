use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, records_table};
use crate::api::{HttpListSource, ListSource};
use crate::config::Config;
use crate::error::Result;
use crate::list::{InfiniteList, ListSettings, QueryKey, ScrollMetrics};
use crate::notify::TerminalNotifier;
use crate::realtime::PushChannel;
use crate::types::{Record, Resource};

/// Height of the simulated viewport and of one row, in pixels.
const VIEWPORT_HEIGHT: f64 = 600.0;
const ROW_HEIGHT: f64 = 48.0;

pub struct ScrollOptions {
    pub resource: Resource,
    pub search: Option<String>,
    pub max_pages: usize,
    pub json: bool,
}

/// Load a list page by page, the way infinite scrolling does
pub async fn cmd_scroll(opts: ScrollOptions) -> Result<()> {
    let config = Config::load()?;
    let source = Arc::new(HttpListSource::<Record>::from_config(&config, opts.resource)?);

    let mut key = QueryKey::new(config.lists.per_page);
    if let Some(search) = opts.search.as_deref() {
        key.set_search(search);
    }
    let list = InfiniteList::new(
        source,
        config.current_user(),
        Arc::new(TerminalNotifier),
        key,
        config.lists.scroll_threshold,
    );
    let settings = ListSettings::for_resource(opts.resource, &config.lists);
    list.watch(PushChannel::new(), settings.watches);

    scroll_to_end(&list, opts.max_pages).await;
    let rows = list.rows();
    list.close();

    let json_output = json!({
        "resource": opts.resource.path(),
        "items": rows,
        "pages": list.page_count(),
        "totalItems": list.total_items(),
        "hasMore": list.has_next_page(),
    });
    let mut text_output = records_table(opts.resource, &rows);
    let summary = format!(
        "Loaded {} of {} in {} page(s)",
        rows.len(),
        list.total_items().unwrap_or(0),
        list.page_count()
    );
    text_output.push('\n');
    text_output.push_str(&summary.dimmed().to_string());

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(opts.json)
}

/// Keep "scrolling" to the bottom until the list is exhausted, a page fails
/// or `max_pages` pages are loaded. Returns the number of pages loaded.
pub(crate) async fn scroll_to_end<S: ListSource>(list: &InfiniteList<S>, max_pages: usize) -> usize {
    while list.page_count() < max_pages {
        let content_height = list.rows().len() as f64 * ROW_HEIGHT;
        let metrics = ScrollMetrics::new(
            VIEWPORT_HEIGHT,
            (content_height - VIEWPORT_HEIGHT).max(0.0),
            content_height,
        );
        if !list.on_scroll(metrics) {
            break;
        }
        list.settled().await;
        if list.last_error().is_some() {
            break;
        }
    }
    list.page_count()
}
