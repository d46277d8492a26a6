//! Diagnostics capability
//!
//! Every parser handle carries a [`Logger`] injected at construction. The
//! logger forwards `(context, severity, message)` triples to a
//! [`LogHandler`]; there is no process-wide callback, so two handles in the
//! same process can report to different sinks.
//!
//! # Example
//!
//! ```
//! use speechgram::logging::{Logger, Severity};
//! use std::sync::{Arc, Mutex};
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let sink = lines.clone();
//! let logger = Logger::new(move |ctx: &str, sev: Severity, msg: &str| {
//!     sink.lock().unwrap().push(format!("{} {} {}", ctx, sev, msg));
//! });
//!
//! logger.log("call-1", Severity::Info, "hello");
//! assert_eq!(lines.lock().unwrap().len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

/// Logging macros - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Logging macros - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { ::log::debug!($($arg)*) };
}

pub(crate) use log_debug;

/// Message severity
///
/// Ordered from least to most severe. The numeric [`code`](Severity::code)
/// keeps the legacy values used by telephony hosts, which run in the
/// opposite direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Tracing output
    Debug,
    /// Normal but significant
    Notice,
    /// Informational
    Info,
    /// Recoverable problem
    Warning,
    /// Operation failed
    Error,
    /// Critical condition
    Crit,
    /// Action must be taken immediately
    Alert,
}

impl Severity {
    /// Legacy numeric level
    pub fn code(self) -> u8 {
        match self {
            Severity::Debug => 7,
            Severity::Info => 6,
            Severity::Notice => 5,
            Severity::Warning => 4,
            Severity::Error => 3,
            Severity::Crit => 2,
            Severity::Alert => 1,
        }
    }

    /// Severity for a legacy numeric level
    pub fn from_code(code: u8) -> Option<Severity> {
        match code {
            7 => Some(Severity::Debug),
            6 => Some(Severity::Info),
            5 => Some(Severity::Notice),
            4 => Some(Severity::Warning),
            3 => Some(Severity::Error),
            2 => Some(Severity::Crit),
            1 => Some(Severity::Alert),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "DEBUG",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Crit => "CRIT",
            Severity::Alert => "ALERT",
        };
        f.write_str(name)
    }
}

/// Receiver of diagnostic messages
pub trait LogHandler: Send + Sync {
    /// Handle one message. `context` is the session id of the emitting handle.
    fn log(&self, context: &str, severity: Severity, message: &str);
}

impl<F> LogHandler for F
where
    F: Fn(&str, Severity, &str) + Send + Sync,
{
    fn log(&self, context: &str, severity: Severity, message: &str) {
        self(context, severity, message)
    }
}

/// Forwards messages to the `log` crate
#[cfg(feature = "logging")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateHandler;

#[cfg(feature = "logging")]
impl LogHandler for LogCrateHandler {
    fn log(&self, context: &str, severity: Severity, message: &str) {
        let level = match severity {
            Severity::Debug => ::log::Level::Debug,
            Severity::Notice | Severity::Info => ::log::Level::Info,
            Severity::Warning => ::log::Level::Warn,
            Severity::Error | Severity::Crit | Severity::Alert => ::log::Level::Error,
        };
        ::log::log!(target: "speechgram", level, "[{}] {}", context, message);
    }
}

/// Cloneable logging capability
///
/// A logger without a handler discards everything.
#[derive(Clone)]
pub struct Logger {
    handler: Option<Arc<dyn LogHandler>>,
    min_severity: Severity,
}

impl Logger {
    /// Logger that reports to `handler`
    pub fn new(handler: impl LogHandler + 'static) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            min_severity: Severity::Debug,
        }
    }

    /// Logger that discards all messages
    pub fn none() -> Self {
        Self {
            handler: None,
            min_severity: Severity::Debug,
        }
    }

    /// Logger backed by the `log` crate
    #[cfg(feature = "logging")]
    pub fn log_crate() -> Self {
        Self::new(LogCrateHandler)
    }

    /// Drop messages below `severity`
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Whether a message at `severity` would reach the handler
    #[inline]
    pub fn enabled(&self, severity: Severity) -> bool {
        self.handler.is_some() && severity >= self.min_severity
    }

    /// Emit a message
    pub fn log(&self, context: &str, severity: Severity, message: &str) {
        if let Some(handler) = &self.handler {
            if severity >= self.min_severity {
                handler.log(context, severity, message);
            }
        }
    }

    /// Emit a lazily formatted message
    pub fn log_with<F>(&self, context: &str, severity: Severity, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled(severity) {
            self.log(context, severity, &message());
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.handler.is_some())
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture() -> (Logger, Arc<Mutex<Vec<(String, Severity, String)>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = Logger::new(move |ctx: &str, sev: Severity, msg: &str| {
            sink.lock()
                .unwrap()
                .push((ctx.to_string(), sev, msg.to_string()));
        });
        (logger, lines)
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Notice);
        assert!(Severity::Notice < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Error < Severity::Crit);
        assert!(Severity::Crit < Severity::Alert);
    }

    #[test]
    fn test_legacy_codes() {
        assert_eq!(Severity::Debug.code(), 7);
        assert_eq!(Severity::Alert.code(), 1);
        for code in 1..=7 {
            assert_eq!(Severity::from_code(code).unwrap().code(), code);
        }
        assert!(Severity::from_code(0).is_none());
    }

    #[test]
    fn test_logger_forwards() {
        let (logger, lines) = capture();
        logger.log("abc", Severity::Warning, "careful");

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "abc");
        assert_eq!(lines[0].1, Severity::Warning);
        assert_eq!(lines[0].2, "careful");
    }

    #[test]
    fn test_min_severity_filters() {
        let (logger, lines) = capture();
        let logger = logger.with_min_severity(Severity::Warning);
        logger.log("abc", Severity::Debug, "dropped");
        logger.log_with("abc", Severity::Info, || "dropped".to_string());
        logger.log("abc", Severity::Error, "kept");

        assert_eq!(lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_none_logger_is_disabled() {
        let logger = Logger::none();
        assert!(!logger.enabled(Severity::Alert));
        logger.log("abc", Severity::Alert, "nobody hears this");
    }
}
