//! From trait implementations for GemmaError conversions

use super::types::GemmaError;

impl From<std::io::Error> for GemmaError {
    fn from(error: std::io::Error) -> Self {
        Self::storage(error.to_string())
    }
}

impl From<serde_json::Error> for GemmaError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<reqwest::Error> for GemmaError {
    fn from(error: reqwest::Error) -> Self {
        let url = error.url().map(|u| u.to_string());
        match error.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: error.to_string(),
                url,
            },
            None if error.is_decode() => Self::MalformedResponse {
                message: error.to_string(),
                url,
            },
            None => Self::Transport {
                message: error.to_string(),
                url,
            },
        }
    }
}
