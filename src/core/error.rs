//! Unified error handling for scriptload
//!
//! Fetch failures are the only domain error. They are logged and folded into
//! normal completion, so they never surface as a [`LoadError`]. The loader
//! errors cover configuration, I/O and runtime plumbing around the
//! coordinator.

use std::fmt;

/// A requested resource could not be loaded or executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub reason: String,
}

impl FetchFailure {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {}: {}", self.url, self.reason)
    }
}

impl std::error::Error for FetchFailure {}

/// Unified error types for the loader
#[derive(Debug)]
pub enum LoadError {
    /// Configuration-related errors
    Configuration(String),

    /// File system and I/O errors
    Io(std::io::Error),

    /// Validation errors
    Validation(String),

    /// The coordinator was dropped before a completion gate fired
    Abandoned,

    /// No async runtime was available where one was required
    Runtime(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            LoadError::Io(err) => write!(f, "I/O error: {err}"),
            LoadError::Validation(msg) => write!(f, "Validation error: {msg}"),
            LoadError::Abandoned => write!(f, "Loader dropped before completion"),
            LoadError::Runtime(msg) => write!(f, "Runtime error: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Io(err)
    }
}

impl From<validator::ValidationErrors> for LoadError {
    fn from(err: validator::ValidationErrors) -> Self {
        LoadError::Validation(err.to_string())
    }
}

impl From<tokio::runtime::TryCurrentError> for LoadError {
    fn from(err: tokio::runtime::TryCurrentError) -> Self {
        LoadError::Runtime(err.to_string())
    }
}

impl From<futures::channel::oneshot::Canceled> for LoadError {
    fn from(_: futures::channel::oneshot::Canceled) -> Self {
        LoadError::Abandoned
    }
}

/// Result type alias for loader operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> LoadResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> LoadResult<T> {
        self.map_err(|e| LoadError::Configuration(format!("{context}: {e}")))
    }
}

/// Convenience macro for configuration errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::LoadError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::LoadError::Configuration(format!($fmt, $($arg)*))
    };
}
