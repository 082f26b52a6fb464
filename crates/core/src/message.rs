//! Message and Conversation domain types.
//!
//! A conversation is the per-environment chat state: the ordered message log
//! replayed to the model on every call, the running token count, and the flag
//! saying whether the environment's files have been committed as context.

use serde::{Deserialize, Serialize};

/// The default system prompt every conversation starts with.
///
/// `messages[0]` of any conversation is always this prompt; no operation
/// removes it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You're a helpful assistant who answers questions, \
    generates information based on the files if they are given. \
    Use only plain text without formatting.";

/// Template for a committed file's system message. The filename and content
/// are appended.
const FILE_CONTEXT_TEMPLATE: &str = "This is the content of file ";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions: the default prompt and committed file contents
    System,
    /// The end user
    User,
    /// The model
    Assistant,
}

/// A single message in a conversation. Order is semantically significant —
/// the log is replayed verbatim as conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create the system message carrying one committed file's content.
    pub fn file_context(filename: &str, content: &str) -> Self {
        Self::system(format!("{FILE_CONTEXT_TEMPLATE}{filename}: {content}"))
    }
}

/// Per-environment chat state: ordered message log, accumulated token usage,
/// and the commit flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered messages; index 0 is always the default system prompt.
    pub messages: Vec<Message>,

    /// Cumulative tokens consumed by model exchanges since the last reset.
    pub tokens: u64,

    /// True once file contents have been loaded as system messages; false
    /// again after a reset.
    pub committed: bool,
}

impl Conversation {
    /// Create a fresh conversation: default system prompt only, no tokens,
    /// not committed.
    ///
    /// Each conversation gets its own copy of the default prompt — the list
    /// is never shared between conversations.
    pub fn new() -> Self {
        Self {
            messages: vec![Message::system(DEFAULT_SYSTEM_PROMPT)],
            tokens: 0,
            committed: false,
        }
    }

    /// Create a conversation preloaded with file-derived and extra messages.
    ///
    /// `committed` is true exactly when `file_messages` is non-empty.
    pub fn with_context(file_messages: Vec<Message>, extra_messages: Vec<Message>) -> Self {
        let committed = !file_messages.is_empty();
        let mut messages = vec![Message::system(DEFAULT_SYSTEM_PROMPT)];
        messages.extend(file_messages);
        messages.extend(extra_messages);
        Self {
            messages,
            tokens: 0,
            committed,
        }
    }

    /// Reset in place to the default prompt only, zero tokens, not committed.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
        self.tokens = 0;
        self.committed = false;
    }

    /// Append a message to the log.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The user-visible transcript: every message whose role is not system.
    pub fn transcript(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
