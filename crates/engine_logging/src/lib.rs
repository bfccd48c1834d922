#![deny(missing_docs)]
//! Logging macros shared by the FANBOX archiver crates.
//!
//! Every macro logs under [`TARGET`], so archiver lines can be filtered apart
//! from the HTTP stack's own logging.

use log::LevelFilter;

/// Log target of all `engine_*` macros.
pub const TARGET: &str = "fanbox";

/// Environment variable overriding the level used by [`initialize_for_tests`].
pub const TEST_LOG_ENV: &str = "FANBOX_TEST_LOG";

/// Logs a trace-level message under [`TARGET`].
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an info-level message under [`TARGET`].
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message under [`TARGET`].
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message under [`TARGET`].
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an error-level message under [`TARGET`].
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Initializes a terminal logger showing only archiver lines, for use in tests.
///
/// The level comes from `FANBOX_TEST_LOG` (`off`, `error` .. `trace`) and
/// defaults to debug. Safely no-ops if a logger is already installed.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    let level = std::env::var(TEST_LOG_ENV)
        .ok()
        .and_then(|value| parse_level(&value))
        .unwrap_or(LevelFilter::Debug);
    let config = ConfigBuilder::new().add_filter_allow_str(TARGET).build();

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}
