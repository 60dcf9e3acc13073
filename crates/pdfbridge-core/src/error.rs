//! Error types for pdfbridge.
//!
//! Provides [`PdfError`], the single error type surfaced to callers, with
//! three families: engine faults ([`PdfError::Engine`], carrying an
//! [`ErrorCode`]), invalid cursor operations ([`PdfError::Iterator`]) and
//! failures raised inside caller-supplied handlers
//! ([`PdfError::HandlerInvocation`]). [`HandlerError`] is what a handler
//! itself returns.

use std::fmt;

/// Numeric classification of engine faults.
///
/// The numbering is stable and appears in error text as `code=<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unclassified failure.
    Generic = 1,
    /// Operating system failure (I/O).
    System = 2,
    /// Failure inside a third-party library.
    Library = 3,
    /// An argument was out of range or otherwise invalid.
    Argument = 4,
    /// A configured resource limit was exceeded.
    Limit = 5,
    /// The input uses a feature that is not supported.
    Unsupported = 6,
    /// The input is not in the expected format.
    Format = 7,
    /// The input is syntactically broken.
    Syntax = 8,
}

impl ErrorCode {
    /// Returns the numeric value of this code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Fatal error types for pdfbridge operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// A fault reported by the document engine.
    Engine {
        /// Classification of the fault.
        code: ErrorCode,
        /// Human-readable description.
        message: String,
    },
    /// An outline cursor was asked to operate from an invalid position.
    Iterator(String),
    /// A caller-supplied handler failed, panicked, or was declared with a
    /// signature that does not match its extension point.
    HandlerInvocation {
        /// Name of the handler that failed.
        handler: String,
        /// The handler's own message, unmodified.
        message: String,
    },
}

impl PdfError {
    /// Create an engine error.
    pub fn engine(code: ErrorCode, message: impl Into<String>) -> Self {
        PdfError::Engine {
            code,
            message: message.into(),
        }
    }

    /// Create an `Argument` engine error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::engine(ErrorCode::Argument, message)
    }

    /// Create a `Generic` engine error.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::engine(ErrorCode::Generic, message)
    }

    /// Create an iterator error.
    pub fn iterator(message: impl Into<String>) -> Self {
        PdfError::Iterator(message.into())
    }

    /// Create a handler invocation error.
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        PdfError::HandlerInvocation {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// The engine error code, if this is an engine error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            PdfError::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if the error was raised by a caller-supplied handler.
    pub fn is_handler_error(&self) -> bool {
        matches!(self, PdfError::HandlerInvocation { .. })
    }
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::Engine { code, message } => write!(f, "code={code}: {message}"),
            PdfError::Iterator(msg) => write!(f, "outline iterator error: {msg}"),
            PdfError::HandlerInvocation { handler, message } => {
                write!(f, "handler {handler} failed: {message}")
            }
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::engine(ErrorCode::System, err.to_string())
    }
}

/// The error a handler returns to the bridge.
///
/// Only the message survives the trip back to the caller; it is carried
/// verbatim into [`PdfError::HandlerInvocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The handler's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// An engine error raised inside a handler (for example a nested engine
/// call that failed) keeps its full text.
impl From<PdfError> for HandlerError {
    fn from(err: PdfError) -> Self {
        Self::new(err.to_string())
    }
}
