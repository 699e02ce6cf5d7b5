use clap::{Parser, Subcommand};

use crate::types::{Resource, VALID_RESOURCES};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Browse the wholesale portal's lists from the terminal")]
#[command(version)]
pub struct Cli {
    /// Log fetch activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show one page of a list
    #[command(visible_alias = "ls")]
    List {
        /// Resource: products, documents, downloads, nlf-templates
        #[arg(value_parser = parse_resource)]
        resource: Resource,

        /// Search text
        #[arg(short, long)]
        search: Option<String>,

        /// Page to show (clamped to the last page)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Rows per page (default: lists.per_page)
        #[arg(long)]
        per_page: Option<u32>,

        /// Filter as key=value, repeatable
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Tab to open, e.g. `active` for products
        #[arg(short, long)]
        tab: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a list page by page, the way infinite scrolling does
    Scroll {
        /// Resource: products, documents, downloads, nlf-templates
        #[arg(value_parser = parse_resource)]
        resource: Resource,

        /// Search text
        #[arg(short, long)]
        search: Option<String>,

        /// Stop after this many pages
        #[arg(long, default_value = "10")]
        max_pages: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (api.base_url, api.timeout, auth.token, lists.per_page, ...)
        key: String,
        /// Value to set
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the config file location
    Path,
}

impl Commands {
    /// Execute the command, dispatching to the appropriate handler.
    pub async fn run(self) -> crate::error::Result<()> {
        use crate::commands::{
            ListOptions, ScrollOptions, cmd_config_path, cmd_config_set, cmd_config_show,
            cmd_list, cmd_scroll,
        };

        match self {
            Commands::List {
                resource,
                search,
                page,
                per_page,
                filters,
                tab,
                json,
            } => {
                cmd_list(ListOptions {
                    resource,
                    search,
                    page,
                    per_page,
                    filters,
                    tab,
                    json,
                })
                .await
            }

            Commands::Scroll {
                resource,
                search,
                max_pages,
                json,
            } => {
                cmd_scroll(ScrollOptions {
                    resource,
                    search,
                    max_pages,
                    json,
                })
                .await
            }

            Commands::Config { action } => match action {
                ConfigAction::Show { json } => cmd_config_show(json),
                ConfigAction::Set { key, value, json } => cmd_config_set(&key, &value, json),
                ConfigAction::Path => cmd_config_path(),
            },
        }
    }
}

fn parse_resource(s: &str) -> Result<Resource, String> {
    s.parse().map_err(|_| {
        format!(
            "Invalid resource. Must be one of: {}",
            VALID_RESOURCES.join(", ")
        )
    })
}

/// Parse `key=value`. The value may be empty; the key may not.
fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Invalid filter '{s}'. Expected key=value")),
    }
}
