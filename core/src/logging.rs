//! Leveled diagnostics with fixed message codes.
//!
//! The codes below are stable and carried on every message so log consumers
//! can filter on them without parsing text.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum LogCode {
    /// Duration of one mapping compile
    CompileTime = 1000,
    /// SQL text, emitted right before execution
    ExecutingQuery = 1001,
    /// Time until the driver returned a reader
    ExecuteTime = 1002,
    /// Time spent materializing the row stream
    ParseTime = 1003,
    /// An object or collection element was created
    ObjectGraphNodeAllocated = 1004,
    /// A cell was converted into a collection representation it is not stored as
    InefficientCollectionConversion = 2000,
}

impl LogCode {
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for LogCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Sink for compiler and execution diagnostics.
pub trait Logger: Send + Sync + fmt::Debug {
    /// Lets callers skip building messages nobody will read.
    fn enabled(&self, level: LogLevel) -> bool;

    fn log(&self, level: LogLevel, code: LogCode, message: &str);
}

/// Forwards every message to `tracing` with `code` as a structured field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warning => tracing::enabled!(tracing::Level::WARN),
        }
    }

    fn log(&self, level: LogLevel, code: LogCode, message: &str) {
        let code = code.code();
        match level {
            LogLevel::Debug => tracing::debug!(code, "{message}"),
            LogLevel::Info => tracing::info!(code, "{message}"),
            LogLevel::Warning => tracing::warn!(code, "{message}"),
        }
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn enabled(&self, _level: LogLevel) -> bool {
        false
    }

    fn log(&self, _level: LogLevel, _code: LogCode, _message: &str) {}
}

/// Emit a message through a [`Logger`], formatting only when the level is enabled.
///
/// ```ignore
/// rowshape_log!(settings.logger, Info, ExecutingQuery, "{}", sql);
/// ```
#[macro_export]
macro_rules! rowshape_log {
    ($logger:expr, $level:ident, $code:ident, $($arg:tt)+) => {{
        let logger: &dyn $crate::logging::Logger = &*$logger;
        if logger.enabled($crate::logging::LogLevel::$level) {
            logger.log(
                $crate::logging::LogLevel::$level,
                $crate::logging::LogCode::$code,
                &format!($($arg)+),
            );
        }
    }};
}
