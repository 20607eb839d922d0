//! Logging setup shared by Keyward binaries.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable. Request spans from
/// `tower_http` are kept at `info` so every API call leaves one line.
pub const DEFAULT_FILTER: &str = "keyward_server=info,keyward_core=info,tower_http=info";

/// Build the log filter from an optional `RUST_LOG` value.
///
/// An invalid directive string falls back to [`DEFAULT_FILTER`] rather than
/// silencing everything.
pub fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber: human-readable lines, or one JSON object
/// per event when `log_json` is set.
pub fn init_tracing(log_json: bool) {
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_uses_default_filter() {
        assert_eq!(log_filter(None).to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
        assert_eq!(
            log_filter(Some("  ")).to_string(),
            EnvFilter::new(DEFAULT_FILTER).to_string()
        );
    }

    #[test]
    fn rust_log_overrides_default() {
        assert_eq!(log_filter(Some("keyward_server=debug")).to_string(), "keyward_server=debug");
    }

    #[test]
    fn invalid_directive_falls_back() {
        assert_eq!(
            log_filter(Some("keyward_server=loud")).to_string(),
            EnvFilter::new(DEFAULT_FILTER).to_string()
        );
    }
}
