//! Conversation types shared by every agent, plus the wire format of the
//! Anthropic Messages endpoint.
//!
//! A conversation is an ordered list of [`ConversationTurn`]s. The Messages API
//! keeps the system prompt out of the message list, so
//! [`MessagesRequest::from_conversation`] lifts system turns into the top-level
//! `system` field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who produced a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance in an agent's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    /// Model identifier (e.g. "claude-haiku-4-5-20251001").
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Persona text, sent outside the message list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Alternating user/assistant messages.
    pub messages: Vec<Message>,
}

impl MessagesRequest {
    /// Build a request from an agent's conversation.
    ///
    /// System turns are joined into `system`; user and assistant turns keep
    /// their order in `messages`.
    pub fn from_conversation(
        model: &str,
        max_tokens: u32,
        conversation: &[ConversationTurn],
    ) -> Self {
        let system: Vec<&str> = conversation
            .iter()
            .filter(|t| t.role == Role::System)
            .map(|t| t.text.as_str())
            .collect();

        let messages = conversation
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| Message {
                role: t.role.as_str().to_string(),
                content: t.text.clone(),
            })
            .collect();

        Self {
            model: model.to_string(),
            max_tokens,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages,
        }
    }
}

/// A single message in the Messages API format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Response body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    /// Why generation stopped ("end_turn", "max_tokens"). `None` while in progress.
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl MessagesResponse {
    /// Concatenated text of every `text` block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.content_type == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A content block of a response. Serialized with a `"type"` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

/// Token accounting for one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
