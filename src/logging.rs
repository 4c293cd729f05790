//! Logging setup
//!
//! Everything logs through the `log` facade; the binary installs
//! `env_logger` writing to stderr. `RUST_LOG` takes precedence over the
//! verbosity passed on the command line.

use env_logger::{Builder, Env};
use log::{info, LevelFilter};

/// Map a `-v` count onto a level filter
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger. Safe to call more than once.
pub fn init(verbosity: u8) {
    let level = level_for_verbosity(verbosity).to_string().to_lowercase();
    let _ = Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

/// Log a phase separator
pub fn separator(label: &str) {
    info!("========== {} ==========", label);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(1), LevelFilter::Info);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(3), LevelFilter::Trace);
        assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0);
        init(2);
    }
}
