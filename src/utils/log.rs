//! Minimal leveled logger.
//!
//! The level is stored in a process-wide atomic; messages below it are
//! dropped before formatting. Use the crate-level `info!`, `warn!`, and
//! `error!` macros rather than calling [`log`] directly.

use std::fmt::Arguments;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Log level for filtering messages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Parses a level name; unknown names default to `Info`.
    pub fn from_name(name: &str) -> Level {
        match name.to_ascii_lowercase().as_str() {
            "warn" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Sets the minimum level that will be emitted.
pub fn init(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Initializes the level from the `TIERCHAIN_LOG` environment variable.
pub fn init_from_env() {
    if let Ok(name) = std::env::var("TIERCHAIN_LOG") {
        init(Level::from_name(&name));
    }
}

#[inline]
fn enabled(level: Level) -> bool {
    level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Emits one formatted line to stderr if `level` passes the filter.
pub fn log(level: Level, args: Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    eprintln!(
        "{}.{:03} [{:5}] {}",
        now.as_secs(),
        now.subsec_millis(),
        level.tag(),
        args
    );
}

/// Logs at info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::utils::log::log($crate::utils::log::Level::Info, format_args!($($arg)*))
    };
}

/// Logs at warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::utils::log::log($crate::utils::log::Level::Warn, format_args!($($arg)*))
    };
}

/// Logs at error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::utils::log::log($crate::utils::log::Level::Error, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn from_name_parses_known_levels() {
        assert_eq!(Level::from_name("warn"), Level::Warn);
        assert_eq!(Level::from_name("ERROR"), Level::Error);
        assert_eq!(Level::from_name("info"), Level::Info);
        assert_eq!(Level::from_name("garbage"), Level::Info);
    }

    #[test]
    fn filter_respects_configured_level() {
        init(Level::Warn);
        assert!(!enabled(Level::Info));
        assert!(enabled(Level::Warn));
        assert!(enabled(Level::Error));
        init(Level::Info);
        assert!(enabled(Level::Info));
    }
}
