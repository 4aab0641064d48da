//! Chat about the active artifact

mod service;
mod session;

pub use service::{ChatExchange, ChatService, ChatStrategy};
pub use session::{ChatSession, DEFAULT_HISTORY_LIMIT, Message, Role};
