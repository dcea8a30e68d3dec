//! Logging bootstrap.
//!
//! Events go to stderr so stdout carries only rewritten text or JSON.
//! A bare level such as `debug` applies to the redraft crates only; HTTP and
//! runtime dependencies stay at `warn`. Full directive strings are used as
//! given.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{AppError, AppResult};

const WORKSPACE_CRATES: [&str; 5] = [
    "redraft",
    "redraft_core",
    "redraft_llm",
    "redraft_prompt",
    "redraft_rewrite",
];

/// Set `REDRAFT_LOG_FORMAT=json` for one JSON object per event.
const LOG_FORMAT_ENV: &str = "REDRAFT_LOG_FORMAT";

/// Initialize the global subscriber.
///
/// # Arguments
/// * `log_level` - A bare level (`"debug"`) or a directive string
///   (`"redraft_rewrite=trace,reqwest=debug"`). Defaults to `info`.
/// * `no_color` - Disable ANSI colors
///
/// # Example
/// ```no_run
/// use redraft_core::logging::init_logging;
///
/// init_logging(Some("debug"), false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let filter = build_filter(log_level)?;
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(!no_color && std::env::var("NO_COLOR").is_err())
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Turn a level or directive string into an `EnvFilter`.
pub fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let level = log_level.map(str::trim).filter(|level| !level.is_empty());

    let directives = match level {
        Some(directives) if directives.contains('=') || directives.contains(',') => {
            directives.to_string()
        }
        Some(level) => scoped(level),
        None => scoped("info"),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| AppError::Config(format!("Invalid log filter {:?}: {}", directives, e)))
}

fn scoped(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level)),
    );
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_is_scoped_to_workspace() {
        let filter = build_filter(Some("debug")).unwrap().to_string();
        assert!(filter.contains("redraft_rewrite=debug"));
        assert!(filter.contains("warn"));
    }

    #[test]
    fn test_directives_pass_through() {
        let filter = build_filter(Some("reqwest=trace")).unwrap().to_string();
        assert!(filter.contains("reqwest=trace"));
        assert!(!filter.contains("redraft_llm"));
    }

    #[test]
    fn test_default_is_info() {
        let filter = build_filter(None).unwrap().to_string();
        assert!(filter.contains("redraft_core=info"));
        assert_eq!(build_filter(Some("  ")).unwrap().to_string(), filter);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let result = build_filter(Some("redraft=loudest"));
        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(build_filter(Some("loudest")).is_err());
    }
}
