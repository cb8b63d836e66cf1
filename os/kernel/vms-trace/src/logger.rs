use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

use crate::vms_trace;

pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Take the threshold from the environment variable `var` (`off`,
    /// `error` … `trace`, case-insensitive), falling back to `default` when
    /// it is unset or unparsable.
    #[must_use]
    pub fn from_env(var: &str, default: LevelFilter) -> Self {
        Self::new(parse_level(std::env::var(var).ok().as_deref(), default))
    }

    #[inline]
    #[must_use]
    pub const fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Install as the global logger. Call this once during start-up.
    ///
    /// # Errors
    /// If a global logger has already been installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

fn parse_level(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        vms_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level(Some("debug"), LevelFilter::Info), LevelFilter::Debug);
        assert_eq!(parse_level(Some(" TRACE "), LevelFilter::Info), LevelFilter::Trace);
        assert_eq!(parse_level(Some("off"), LevelFilter::Info), LevelFilter::Off);
    }

    #[test]
    fn unset_or_garbage_falls_back() {
        assert_eq!(parse_level(None, LevelFilter::Info), LevelFilter::Info);
        assert_eq!(parse_level(Some("loud"), LevelFilter::Warn), LevelFilter::Warn);
    }

    #[test]
    fn threshold_filters_records() {
        let logger = StderrLogger::new(LevelFilter::Info);
        let meta = |level| Metadata::builder().level(level).target("vms").build();
        assert!(logger.enabled(&meta(Level::Error)));
        assert!(logger.enabled(&meta(Level::Info)));
        assert!(!logger.enabled(&meta(Level::Debug)));
    }
}
