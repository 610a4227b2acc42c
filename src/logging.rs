//! Tracing subscriber setup.
//!
//! Logs go to stderr; stdout is reserved for JSON results.
//! Filter precedence: `--log`, then `CRISK_LOG`, then `RUST_LOG`, then
//! `credit_risk=info`.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVES: &str = "credit_risk=info";

/// Install the global subscriber. A second call is a no-op.
pub fn init(flag: Option<&str>, configured: Option<&str>) {
    let filter = build_filter(flag, configured);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_filter(flag: Option<&str>, configured: Option<&str>) -> EnvFilter {
    // Unparseable directives fall through to the next source.
    for directives in [flag, configured].into_iter().flatten() {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(DEFAULT_DIRECTIVES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_takes_precedence() {
        let filter = build_filter(Some("credit_risk=trace"), Some("credit_risk=warn"));
        assert_eq!(filter.to_string(), "credit_risk=trace");
    }

    #[test]
    fn configured_directives_used_without_flag() {
        let filter = build_filter(None, Some("credit_risk=debug"));
        assert_eq!(filter.to_string(), "credit_risk=debug");
    }
}
