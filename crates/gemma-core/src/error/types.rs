//! Core error type and context extension traits

use thiserror::Error;

/// Result type alias for console operations
pub type GemmaResult<T> = Result<T, GemmaError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> GemmaResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> GemmaResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> GemmaResult<T> {
        self.map_err(|e| GemmaError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> GemmaResult<T> {
        self.map_err(|e| GemmaError::other(format!("{}: {}", f(), e)))
    }
}

/// Extension trait for converting Options into Results
pub trait OptionExt<T> {
    /// Convert Option to Result with context message
    fn context<C: std::fmt::Display>(self, context: C) -> GemmaResult<T>;

    /// Convert Option to Result with lazy context message
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> GemmaResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> GemmaResult<T> {
        self.ok_or_else(|| GemmaError::other(context.to_string()))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> GemmaResult<T> {
        self.ok_or_else(|| GemmaError::other(f().to_string()))
    }
}

/// Main error type for the console
#[derive(Error, Debug, Clone)]
pub enum GemmaError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// User input rejected before any request is made
    #[error("Invalid input: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Request could not be delivered or the response never arrived
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        url: Option<String>,
    },

    /// Non-success HTTP status
    #[error("HTTP error (status {status}): {message}")]
    Http {
        status: u16,
        message: String,
        url: Option<String>,
    },

    /// The server-push channel broke mid-run
    #[error("Stream error: {message}")]
    Stream { message: String },

    /// Application error reported by the server (`server_error` events, `error` bodies)
    #[error("Server error: {detail}")]
    Server { detail: String },

    /// A 2xx response whose body could not be decoded
    #[error("Malformed response: {message}")]
    MalformedResponse {
        message: String,
        url: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
    },

    /// Operation was cancelled by the user
    #[error("Operation was cancelled")]
    Cancelled,

    /// Key-value persistence errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        path: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}
