//! Tracing subscriber setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives applied after the base level to quiet the HTTP stack
const QUIET_DEPENDENCIES: &str = "hyper=info,hyper_util=info,reqwest=info,h2=info,alloy_transport_http=info";

/// Filter directive string for a base level. `RUST_LOG` wins when set.
pub fn filter_spec(verbose: bool, env: Option<&str>) -> String {
    match env.map(str::trim).filter(|v| !v.is_empty()) {
        Some(custom) => custom.to_string(),
        None => {
            let base = if verbose { "debug" } else { "info" };
            format!("{},{}", base, QUIET_DEPENDENCIES)
        }
    }
}

/// Install the global subscriber: compact text by default, JSON lines with `json`
pub fn setup_logging(verbose: bool, json: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let spec = filter_spec(verbose, env.as_deref());
    let filter = EnvFilter::try_new(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(false).with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true).compact()).init();
    }

    tracing::debug!(filter = %spec, json, "Logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_spec_levels() {
        assert!(filter_spec(false, None).starts_with("info,"));
        assert!(filter_spec(true, None).starts_with("debug,"));
        assert!(filter_spec(true, Some("  ")).starts_with("debug,"));
    }

    #[test]
    fn test_rust_log_wins() {
        assert_eq!(filter_spec(true, Some("monad_activity=trace")), "monad_activity=trace");
        assert!(EnvFilter::try_new(filter_spec(false, None)).is_ok());
    }
}
