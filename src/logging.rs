use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "STEPSCOPE_LOG";
pub const DEBUG_ENV: &str = "STEPSCOPE_DEBUG";

/// Picks the filter directive: `STEPSCOPE_DEBUG=1` wins, then the explicit
/// level, then `STEPSCOPE_LOG`, then `warn`.
pub fn filter_directive(log_level: Option<&str>, env_level: Option<&str>, debug_flag: Option<&str>) -> String {
    if debug_flag.is_some_and(|flag| flag == "1") {
        return "debug".to_string();
    }
    log_level
        .or(env_level)
        .filter(|level| !level.trim().is_empty())
        .unwrap_or("warn")
        .to_string()
}

/// Installs the global subscriber. Logs go to stderr; stdout carries
/// protocol payloads.
pub fn init_logger(log_level: Option<&str>) {
    let env_level = std::env::var(LOG_ENV).ok();
    let debug_flag = std::env::var(DEBUG_ENV).ok();
    let directive = filter_directive(log_level, env_level.as_deref(), debug_flag.as_deref());

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    let installed = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(%directive, "logger initialised");
    }
}
