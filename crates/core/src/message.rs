//! Message and Session domain types.
//!
//! These are the core value objects that flow through the entire system:
//! User sends a message → Session records it → Agent processes it → Provider
//! generates a response.
//!
//! The transport has no dedicated tool-result role, so tool output re-enters
//! the conversation as a `User` message (the agent loop owns that convention).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, rules, tool protocol)
    System,
    /// The end user — also carries injected tool results
    User,
    /// The model
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A session is an ordered, append-only sequence of messages plus the model
/// selected to answer them.
///
/// This is explicit state passed by reference into the agent loop — there is
/// no process-wide conversation singleton. A leading `System` message anchors
/// behavior and survives [`Session::clear`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// The model answering this session, if one has been selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            messages: Vec::new(),
            model: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a session seeded with a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.push(Message::system(prompt));
        session
    }

    /// Add a message to the session.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Select the model answering this session.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    /// Replace the system anchor, or install one if the session has none.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let message = Message::system(prompt);
        match self.messages.first() {
            Some(first) if first.role == Role::System => self.messages[0] = message,
            _ => self.messages.insert(0, message),
        }
        self.updated_at = Utc::now();
    }

    /// Drop every message except a leading system anchor.
    ///
    /// The model selection is kept — clearing history does not deselect
    /// the model.
    pub fn clear(&mut self) {
        if self
            .messages
            .first()
            .is_some_and(|m| m.role == Role::System)
        {
            self.messages.truncate(1);
        } else {
            self.messages.clear();
        }
        self.updated_at = Utc::now();
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
