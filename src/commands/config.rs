//! Configuration commands.
//!
//! - `config show`: Display current configuration
//! - `config set`: Set a configuration value
//! - `config path`: Print the config file location

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, mask_sensitive_value};
use crate::config::Config;
use crate::error::Result;

/// Show current configuration
pub fn cmd_config_show(json: bool) -> Result<()> {
    let config = Config::load()?;
    show_output(&config).print(json)
}

fn show_output(config: &Config) -> CommandOutput {
    let base_url = config.base_url();
    let token = config.token().map(|t| mask_sensitive_value(&t));

    let json_output = json!({
        "api": {
            "base_url": base_url,
            "timeout": config.api.timeout,
        },
        "auth": {
            "token_configured": token.is_some(),
            "token": token,
        },
        "lists": {
            "per_page": config.lists.per_page,
            "search_debounce_ms": config.lists.search_debounce_ms,
            "scroll_threshold": config.lists.scroll_threshold,
        },
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text_output = String::new();
    text_output.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    text_output.push_str(&format!("{}:\n", "api".cyan()));
    match base_url {
        Some(url) => text_output.push_str(&format!("  base_url: {url}\n")),
        None => text_output.push_str(&format!("  base_url: {}\n", "not configured".dimmed())),
    }
    text_output.push_str(&format!("  timeout: {}s\n\n", config.api.timeout));

    text_output.push_str(&format!("{}:\n", "auth".cyan()));
    match token {
        Some(masked) => text_output.push_str(&format!("  token: {}\n\n", masked.green())),
        None => text_output.push_str(&format!("  token: {}\n\n", "not configured".dimmed())),
    }

    text_output.push_str(&format!("{}:\n", "lists".cyan()));
    text_output.push_str(&format!("  per_page: {}\n", config.lists.per_page));
    text_output.push_str(&format!(
        "  search_debounce_ms: {}\n",
        config.lists.search_debounce_ms
    ));
    text_output.push_str(&format!(
        "  scroll_threshold: {}\n\n",
        config.lists.scroll_threshold
    ));

    text_output.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json_output).with_text(text_output)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, json: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.set_value(key, value)?;
    config.save()?;

    let shown = if key == "auth.token" {
        mask_sensitive_value(value)
    } else {
        value.to_string()
    };
    let json_output = json!({
        "action": "config_set",
        "key": key,
        "value": shown,
        "success": true,
    });
    let text_output = format!("Set {} to {}", key.cyan(), shown);

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(json)
}

/// Print the config file location
pub fn cmd_config_path() -> Result<()> {
    println!("{}", Config::config_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BASE_URL_ENV, TOKEN_ENV};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_show_masks_token() {
        unsafe {
            std::env::remove_var(TOKEN_ENV);
            std::env::remove_var(BASE_URL_ENV);
        }
        let mut config = Config::default();
        config.auth.token = Some("secret-token-value".to_string());
        config.api.base_url = Some("https://portal.example.com/api".to_string());

        let output = show_output(&config);
        let json = output.render(true).unwrap();
        assert!(!json.contains("secret-token-value"));
        assert!(json.contains("se...ue"));
        assert!(json.contains("https://portal.example.com/api"));

        let text = output.render(false).unwrap();
        assert!(!text.contains("secret-token-value"));
        assert!(text.contains("per_page: 10"));
    }
}
