//! Error types for the Gemma console
//!
//! Every fallible operation returns [`GemmaResult`]. The variants line up with the
//! four ways a console operation can go wrong:
//! - validation errors, rejected before anything reaches the network
//! - transport errors (request rejected, stream broken)
//! - degraded-data errors (primary endpoint 404/5xx) that trigger a fallback
//! - application errors reported by the server, surfaced verbatim

mod classify;
mod constructors;
mod conversions;
mod types;

pub use classify::ErrorCategory;
pub use types::{GemmaError, GemmaResult, OptionExt, ResultExt};
