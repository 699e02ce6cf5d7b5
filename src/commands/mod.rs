mod config;
mod list;
mod scroll;

pub use config::{cmd_config_path, cmd_config_set, cmd_config_show};
pub use list::{ListOptions, cmd_list};
pub use scroll::{ScrollOptions, cmd_scroll};

use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::error::Result;
use crate::types::{Record, Resource};

/// Output of one command: always available as JSON, optionally as text.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Render as pretty JSON when `json` is set or no text was provided.
    pub fn render(&self, json: bool) -> Result<String> {
        match (&self.text, json) {
            (Some(text), false) => Ok(text.clone()),
            _ => Ok(serde_json::to_string_pretty(&self.json)?),
        }
    }

    pub fn print(self, json: bool) -> Result<()> {
        println!("{}", self.render(json)?);
        Ok(())
    }
}

/// Table columns shown for each resource: header and JSON field.
pub(crate) fn columns(resource: Resource) -> &'static [(&'static str, &'static str)] {
    match resource {
        Resource::Products => &[
            ("ID", "id"),
            ("Name", "name"),
            ("SKU", "sku"),
            ("Status", "status"),
            ("Price", "price"),
        ],
        Resource::Documents => &[
            ("ID", "id"),
            ("Name", "name"),
            ("Type", "documentType"),
            ("Status", "status"),
            ("Created", "createdAt"),
        ],
        Resource::Downloads => &[
            ("ID", "id"),
            ("File", "fileName"),
            ("State", "state"),
            ("Created", "createdAt"),
        ],
        Resource::NlfTemplates => &[
            ("ID", "id"),
            ("Name", "name"),
            ("Description", "description"),
            ("Updated", "updatedAt"),
        ],
    }
}

/// Render rows as a table with the resource's columns.
pub(crate) fn records_table(resource: Resource, records: &[Record]) -> String {
    let columns = columns(resource);
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|(header, _)| header.to_string()));
    for record in records {
        builder.push_record(columns.iter().map(|(_, key)| match *key {
            "id" => record.id.to_string(),
            key => record.field_text(key),
        }));
    }
    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

/// Mask a sensitive value by showing only the first 2 and last 2 characters
pub(crate) fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}
