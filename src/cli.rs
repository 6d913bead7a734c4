//! Shared pieces of the stage binaries' command lines.

use clap::ValueEnum;

/// Log level selector shared by every stage binary.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// Only critical errors are logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings.
    #[value(alias("1"))]
    Warn,

    /// Log stage-level progress, e.g. which artifacts are written.
    #[value(alias("2"))]
    Info,

    /// Log everything the pipeline does internally.
    #[value(alias("3"))]
    Debug,

    /// Extra-verbose tracing output.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Initialize the process-wide logger from the CLI verbosity.
pub fn init_logging(verbosity: &LogLevel) {
    simple_logger::init_with_level(verbosity.into()).ok();
}
