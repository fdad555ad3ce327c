use tracing::level_filters::LevelFilter;

use crate::config::WaitPolicy;

const NETCHECK_WAIT: &str = "NETCHECK_WAIT";

/// Wait policy override from the environment, if set and valid
pub fn get_wait_policy() -> anyhow::Result<Option<WaitPolicy>> {
    match std::env::var(NETCHECK_WAIT) {
        Ok(value) => Ok(Some(value.parse()?)),
        Err(_) => Ok(None),
    }
}

const NETCHECK_LOG: &str = "NETCHECK_LOG";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(NETCHECK_LOG);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| {
        res.parse().unwrap_or(DEFAULT_LOG_LEVEL)
    })
}

/// Log level for a number of `-v` flags, falling back to the environment
pub fn log_level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => get_log_level(),
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
