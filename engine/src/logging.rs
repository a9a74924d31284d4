//! Tracing subscriber setup shared by binaries

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_FILTER: &str = "info,fooddash_engine=debug";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Initialize logging to stderr (stdout may carry a protocol)
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
