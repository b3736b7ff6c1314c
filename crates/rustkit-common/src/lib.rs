//! # RustKit Common
//!
//! Error type and logging setup shared by the RustKit graphics crates.
//!
//! Errors reported by the context itself keep the operation that raised
//! them, and a lost context has its own variant so callers can wait for the
//! restore instead of failing.

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, try_init_logging, LogConfig, LogFormat};

#[derive(Error, Debug)]
pub enum RustKitError {
    /// No usable rendering context.
    #[error("Context error: {message}")]
    Context { message: String },

    /// The context flagged an error after an operation.
    #[error("GL error after {operation}: {source}")]
    Gl {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The context was lost while an operation ran.
    #[error("Context lost during {operation}")]
    ContextLost { operation: String },

    #[error("Shader error: {message}")]
    Shader { message: String },

    /// Buffer, texture or render target could not be created or used.
    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A failure that should not happen; captures where it did.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        backtrace: Option<backtrace::Backtrace>,
    },
}

impl RustKitError {
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    pub fn gl<E: std::error::Error + Send + Sync + 'static>(
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Gl {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    pub fn context_lost(operation: impl Into<String>) -> Self {
        Self::ContextLost {
            operation: operation.into(),
        }
    }

    pub fn shader(message: impl Into<String>) -> Self {
        Self::Shader {
            message: message.into(),
        }
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    /// Whether retrying after a context restore may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RustKitError::Resource { .. } | RustKitError::ContextLost { .. }
        )
    }

    /// Short label used as a structured log field.
    pub fn category(&self) -> &'static str {
        match self {
            RustKitError::Context { .. } => "context",
            RustKitError::Gl { .. } => "gl",
            RustKitError::ContextLost { .. } => "context_lost",
            RustKitError::Shader { .. } => "shader",
            RustKitError::Resource { .. } => "resource",
            RustKitError::Config { .. } => "config",
            RustKitError::Io(_) => "io",
            RustKitError::NotFound(_) => "not_found",
            RustKitError::InvalidArgument(_) => "invalid_argument",
            RustKitError::Internal { .. } => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, RustKitError>;

/// Wrap foreign errors as internal failures with a message prefix.
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| RustKitError::internal(format!("{}: {}", message.into(), e)))
    }
}

pub trait OptionExt<T> {
    /// `None` becomes [`RustKitError::NotFound`] naming `what`.
    fn ok_or_not_found(self, what: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, what: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| RustKitError::NotFound(what.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("Invalid value")]
    struct InvalidValue;

    #[test]
    fn test_error_categories() {
        assert_eq!(RustKitError::context("no webgl").category(), "context");
        assert_eq!(RustKitError::gl("drawArrays", InvalidValue).category(), "gl");
        assert_eq!(RustKitError::context_lost("draw").category(), "context_lost");
        assert_eq!(RustKitError::shader("bad type").category(), "shader");
        assert_eq!(RustKitError::config("bad json").category(), "config");
        assert_eq!(RustKitError::internal("oops").category(), "internal");
    }

    #[test]
    fn test_gl_error_keeps_source() {
        use std::error::Error as _;

        let err = RustKitError::gl("texImage2D", InvalidValue);
        assert_eq!(err.to_string(), "GL error after texImage2D: Invalid value");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("Invalid value"));
    }

    #[test]
    fn test_recoverable() {
        assert!(RustKitError::resource("buffer lost").is_recoverable());
        assert!(RustKitError::context_lost("drawArrays").is_recoverable());
        assert!(!RustKitError::gl("drawArrays", InvalidValue).is_recoverable());
        assert!(!RustKitError::context("no webgl").is_recoverable());
        assert!(!RustKitError::invalid_argument("x").is_recoverable());
    }

    #[test]
    fn test_result_context() {
        let parsed: std::result::Result<u32, std::num::ParseIntError> = "x".parse::<u32>();
        let err = parsed.context("parsing width").unwrap_err();
        assert!(err.to_string().contains("parsing width"));
        assert_eq!(err.category(), "internal");
    }

    #[test]
    fn test_missing_texture_is_not_found() {
        let none: Option<u32> = None;
        let err = none.ok_or_not_found("texture 'shadow'").unwrap_err();
        assert_eq!(err.to_string(), "Resource not found: texture 'shadow'");
        assert_eq!(Some(7).ok_or_not_found("texture").unwrap(), 7);
    }
}
