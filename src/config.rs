use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Emit a `tracing` event only when the parse's [`Config`] lets `$lvl` through.
///
/// The threshold lives in the configuration handed to [`crate::validate`], not in a global, so
/// two parses in one process can log at different verbosities.
macro_rules! emit {
    ($config:expr, $lvl:expr, $($arg:tt)+) => {
        if $config.enabled($lvl) {
            ::tracing::event!($lvl, $($arg)+);
        }
    };
}

/// Caller-owned settings, passed read-only into every production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Re-read a premature trailer as an extension introducer.
    pub recover_forged_trailers: bool,
    /// Apply accepted patches to a copy of the input and return it in the report.
    pub produce_corrected_output: bool,
    /// Most verbose level the core emits at.
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recover_forged_trailers: false,
            produce_corrected_output: false,
            log_level: LevelFilter::WARN,
        }
    }
}

impl Config {
    pub fn with_recovery(mut self, recover: bool) -> Self {
        self.recover_forged_trailers = recover;
        self
    }

    pub fn with_corrected_output(mut self, produce: bool) -> Self {
        self.produce_corrected_output = produce;
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.log_level
    }
}
