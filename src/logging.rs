//! Tracing subscriber setup for the `portal` binary.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `wholesale_portal=debug`.
pub const LOG_ENV: &str = "PORTAL_LOG";

/// Filter used when `PORTAL_LOG` is unset or invalid.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "wholesale_portal=debug" } else { "warn" }
}

/// Build the filter: `PORTAL_LOG` wins, then the verbosity default.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install a stderr fmt subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_filter_depends_on_verbosity() {
        unsafe { std::env::remove_var(LOG_ENV) };
        assert_eq!(env_filter(false).to_string(), "warn");
        assert_eq!(env_filter(true).to_string(), "wholesale_portal=debug");
    }

    #[test]
    #[serial]
    fn test_env_overrides_default() {
        unsafe { std::env::set_var(LOG_ENV, "info") };
        assert_eq!(env_filter(true).to_string(), "info");
        unsafe { std::env::remove_var(LOG_ENV) };
    }
}
