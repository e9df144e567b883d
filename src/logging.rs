//! Subscriber setup for library consumers and tests.
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ST_QA_LOG";
pub const LOG_FORMAT_ENV: &str = "ST_QA_LOG_FORMAT";

/// `ST_QA_LOG`, then `RUST_LOG`, then `warn`.
pub fn env_filter() -> EnvFilter {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs a global fmt subscriber writing to stderr. Returns false when one
/// was already installed.
pub fn init() -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter()).with_writer(std::io::stderr);
    let json = std::env::var(LOG_FORMAT_ENV).map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
