use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, records_table};
use crate::api::{HttpListSource, ListSource};
use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::list::{ListContext, ListController, ListSettings, ListView, ViewStatus};
use crate::notify::TerminalNotifier;
use crate::realtime::PushChannel;
use crate::types::{Record, Resource};

pub struct ListOptions {
    pub resource: Resource,
    pub search: Option<String>,
    pub page: u32,
    pub per_page: Option<u32>,
    pub filters: Vec<(String, String)>,
    pub tab: Option<String>,
    pub json: bool,
}

/// Show one page of a list
pub async fn cmd_list(opts: ListOptions) -> Result<()> {
    let config = Config::load()?;
    let source = Arc::new(HttpListSource::<Record>::from_config(&config, opts.resource)?);
    let mut settings = ListSettings::for_resource(opts.resource, &config.lists);
    if let Some(per_page) = opts.per_page {
        settings.per_page = per_page.max(1);
    }
    let context = ListContext::new(
        config.current_user(),
        PushChannel::new(),
        Arc::new(TerminalNotifier),
    );

    let view = load_page(source, context, settings, &opts).await?;
    list_output(opts.resource, &view).print(opts.json)
}

/// Drive a controller through the requested inputs and return what it shows.
pub(crate) async fn load_page<S>(
    source: Arc<S>,
    context: ListContext,
    settings: ListSettings,
    opts: &ListOptions,
) -> Result<ListView<S::Row>>
where
    S: ListSource,
{
    let mut controller = ListController::new(source, context, settings);
    if let Some(search) = opts.search.as_deref() {
        controller.search_now(search);
    }
    if let Some(tab) = &opts.tab {
        controller.switch_tab(Some(tab.clone()));
    }
    for (key, value) in &opts.filters {
        let value = (!value.is_empty()).then(|| value.clone());
        controller.set_filter(key, value);
    }

    controller.mount();
    controller.settled().await;
    if opts.page > 1 && controller.snapshot().status != ViewStatus::Failed {
        controller.change_page(opts.page);
        controller.settled().await;
    }

    let view = controller.snapshot();
    controller.unmount();

    if view.status == ViewStatus::Failed {
        return Err(PortalError::Other(
            view.error
                .unwrap_or_else(|| "loading the list failed".to_string()),
        ));
    }
    Ok(view)
}

fn list_output(resource: Resource, view: &ListView<Record>) -> CommandOutput {
    let pagination = &view.pagination;
    let json_output = json!({
        "resource": resource.path(),
        "items": view.rows,
        "meta": {
            "totalItems": pagination.total,
            "itemsPerPage": pagination.per_page,
            "currentPage": pagination.current_page,
            "totalPages": pagination.last_page,
        },
    });

    let text_output = if view.status == ViewStatus::Empty {
        format!("No {} found", resource.path().replace('-', " "))
            .dimmed()
            .to_string()
    } else {
        let range = pagination
            .visible_range(view.rows.len())
            .map(|(first, last)| format!("{first}-{last}"))
            .unwrap_or_default();
        format!(
            "{}\n{}",
            records_table(resource, &view.rows),
            format!(
                "Showing {range} of {} (page {} of {})",
                pagination.total, pagination.current_page, pagination.last_page
            )
            .dimmed()
        )
    };

    CommandOutput::new(json_output).with_text(text_output)
}
