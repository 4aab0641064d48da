//! Constructor methods for GemmaError

use super::types::GemmaError;

impl GemmaError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error naming the offending field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            url: None,
        }
    }

    /// Create a transport error for a specific URL
    pub fn transport_with_url(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            url: Some(url.into()),
        }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            url: None,
        }
    }

    /// Create an HTTP status error for a specific URL
    pub fn http_with_url(status: u16, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            url: Some(url.into()),
        }
    }

    /// Create a new stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a server-reported application error
    pub fn server(detail: impl Into<String>) -> Self {
        Self::Server {
            detail: detail.into(),
        }
    }

    /// Create an error for a success response with an undecodable body
    pub fn malformed_response(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            url: Some(url.into()),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
            context: None,
        }
    }

    /// Create a JSON error with context
    pub fn json_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
        }
    }

    /// Create a not found error with resource type
    pub fn not_found_resource(message: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: Some(resource_type.into()),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: None,
        }
    }

    /// Create a storage error for a specific path
    pub fn storage_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            context: None,
        }
    }
}
