//! Diagnostic sinks for recoverable errors (notices, warnings, deprecations)
//!
//! These never unwind: the operation that raised them continues with its
//! fallback value. Which sink receives them is chosen per request through
//! [`RequestContext::set_error_handler`].
//!
//! [`RequestContext::set_error_handler`]: crate::runtime::context::RequestContext::set_error_handler

use std::io::{self, Write};

pub const E_ERROR: i64 = 1;
pub const E_WARNING: i64 = 2;
pub const E_PARSE: i64 = 4;
pub const E_NOTICE: i64 = 8;
pub const E_USER_ERROR: i64 = 256;
pub const E_USER_WARNING: i64 = 512;
pub const E_USER_NOTICE: i64 = 1024;
pub const E_DEPRECATED: i64 = 8192;
pub const E_ALL: i64 = 32767;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Notice,
    Warning,
    Error,
    ParseError,
    UserNotice,
    UserWarning,
    UserError,
    Deprecated,
}

impl ErrorLevel {
    /// The `E_*` bit for this level.
    pub fn to_bitmask(self) -> i64 {
        match self {
            ErrorLevel::Error => E_ERROR,
            ErrorLevel::Warning => E_WARNING,
            ErrorLevel::ParseError => E_PARSE,
            ErrorLevel::Notice => E_NOTICE,
            ErrorLevel::UserError => E_USER_ERROR,
            ErrorLevel::UserWarning => E_USER_WARNING,
            ErrorLevel::UserNotice => E_USER_NOTICE,
            ErrorLevel::Deprecated => E_DEPRECATED,
        }
    }

    /// Prefix PHP prints in front of the message.
    pub fn label(self) -> &'static str {
        match self {
            ErrorLevel::Notice => "Notice",
            ErrorLevel::Warning => "Warning",
            ErrorLevel::Error => "Fatal error",
            ErrorLevel::ParseError => "Parse error",
            ErrorLevel::UserNotice => "Notice",
            ErrorLevel::UserWarning => "Warning",
            ErrorLevel::UserError => "Fatal error",
            ErrorLevel::Deprecated => "Deprecated",
        }
    }
}

/// Data behind `error_get_last()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub level: ErrorLevel,
    pub message: String,
}

pub trait ErrorHandler {
    fn report(&mut self, level: ErrorLevel, message: &str);
}

/// Prints `Warning: message` lines, as the CLI SAPI does.
pub struct StderrErrorHandler {
    stderr: io::Stderr,
}

impl Default for StderrErrorHandler {
    fn default() -> Self {
        Self {
            stderr: io::stderr(),
        }
    }
}

impl ErrorHandler for StderrErrorHandler {
    fn report(&mut self, level: ErrorLevel, message: &str) {
        let _ = writeln!(self.stderr, "{}: {}", level.label(), message);
        let _ = self.stderr.flush();
    }
}

/// Hands every diagnostic to a closure.
pub struct CapturingErrorHandler<F: FnMut(ErrorLevel, &str)> {
    callback: F,
}

impl<F: FnMut(ErrorLevel, &str)> CapturingErrorHandler<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(ErrorLevel, &str)> ErrorHandler for CapturingErrorHandler<F> {
    fn report(&mut self, level: ErrorLevel, message: &str) {
        (self.callback)(level, message);
    }
}

/// Forwards diagnostics to `tracing`, for hosts that already collect logs.
#[derive(Debug, Default)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn report(&mut self, level: ErrorLevel, message: &str) {
        match level {
            ErrorLevel::Error | ErrorLevel::ParseError | ErrorLevel::UserError => {
                tracing::error!(level = level.label(), "{message}")
            }
            ErrorLevel::Warning | ErrorLevel::UserWarning => {
                tracing::warn!(level = level.label(), "{message}")
            }
            ErrorLevel::Notice | ErrorLevel::UserNotice | ErrorLevel::Deprecated => {
                tracing::info!(level = level.label(), "{message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmasks_fit_e_all() {
        for level in [
            ErrorLevel::Notice,
            ErrorLevel::Warning,
            ErrorLevel::Error,
            ErrorLevel::ParseError,
            ErrorLevel::UserNotice,
            ErrorLevel::UserWarning,
            ErrorLevel::UserError,
            ErrorLevel::Deprecated,
        ] {
            assert_eq!(level.to_bitmask() & E_ALL, level.to_bitmask());
        }
    }

    #[test]
    fn capturing_handler_sees_reports() {
        let mut seen = Vec::new();
        {
            let mut handler = CapturingErrorHandler::new(|level, msg: &str| {
                seen.push((level, msg.to_string()));
            });
            handler.report(ErrorLevel::Warning, "Array to string conversion");
        }
        assert_eq!(
            seen,
            vec![(ErrorLevel::Warning, "Array to string conversion".to_string())]
        );
    }
}
