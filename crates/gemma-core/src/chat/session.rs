//! Chat session data structures

use crate::api::{ChatTurn, Citation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Messages kept per session unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 60;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// System notice
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// Individual chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Sources the assistant cited (assistant only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Conversation bound to exactly one artifact
///
/// Holds at most `limit` messages; the oldest are dropped first.
#[derive(Debug, Clone)]
pub struct ChatSession {
    session_id: String,
    artifact_id: String,
    messages: VecDeque<Message>,
    limit: usize,
}

impl ChatSession {
    pub fn new(artifact_id: impl Into<String>, limit: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            artifact_id: artifact_id.into(),
            messages: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// History in the wire shape, oldest first
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(Message::to_turn)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
