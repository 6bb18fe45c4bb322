//! Turn and Conversation domain types.
//!
//! These are the value objects that flow through the whole loop:
//! the user submits a turn → the orchestrator sends the conversation →
//! the model answers with text or tool calls → tool results are appended.
//!
//! The [`Conversation`] is append-only and enforces the tool-call pairing
//! invariant on every push: an assistant turn carrying N calls must be
//! answered by exactly N tool turns (one per call id) before anything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ConversationError;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The remote model
    Assistant,
    /// Tool execution result
    Tool,
}

/// One segment of multimodal content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        /// e.g. `image/png`
        mime_type: String,
        /// Base64 payload, no data-URI prefix.
        data: String,
    },
}

impl ContentPart {
    /// Render an image part as a `data:` URI. Text parts yield `None`.
    pub fn data_uri(&self) -> Option<String> {
        match self {
            ContentPart::Image { mime_type, data } => Some(format!("data:{mime_type};base64,{data}")),
            ContentPart::Text { .. } => None,
        }
    }
}

/// Turn payload: a plain string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// The textual portion of the content (text parts joined by newlines).
    pub fn text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Parts(parts) => parts.is_empty(),
        }
    }

    /// Number of image parts carried.
    pub fn image_count(&self) -> usize {
        match self {
            Content::Text(_) => 0,
            Content::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::Image { .. }))
                .count(),
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

/// A tool call embedded in an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique ID for this tool call within its assistant turn
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as the raw JSON string the model produced
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,

    /// Text or multimodal content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Reasoning trace returned alongside an assistant answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn blank(role: Role) -> Self {
        Self {
            role,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            reasoning: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a plain-text user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::Text(text.into())),
            ..Self::blank(Role::User)
        }
    }

    /// Create a user turn from optional text and an optional image.
    ///
    /// Plain text alone stays a string payload; anything with an image
    /// becomes a parts list (text first, then the image).
    pub fn user_with_image(text: Option<String>, image: Option<ContentPart>) -> Self {
        let text = text.filter(|t| !t.is_empty());
        let content = match (text, image) {
            (Some(text), None) => Some(Content::Text(text)),
            (None, None) => None,
            (text, Some(image)) => {
                let mut parts = Vec::with_capacity(2);
                if let Some(text) = text {
                    parts.push(ContentPart::Text { text });
                }
                parts.push(image);
                Some(Content::Parts(parts))
            }
        };
        Self {
            content,
            ..Self::blank(Role::User)
        }
    }

    /// Create a final assistant answer.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: Some(Content::Text(content.into())),
            ..Self::blank(Role::Assistant)
        }
    }

    /// Create an assistant turn that requests tool calls.
    pub fn assistant_with_calls(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: content.map(Content::Text),
            tool_calls,
            ..Self::blank(Role::Assistant)
        }
    }

    /// Attach a reasoning trace (assistant turns only).
    pub fn with_reasoning(mut self, reasoning: Option<String>) -> Self {
        if self.role == Role::Assistant {
            self.reasoning = reasoning.filter(|r| !r.is_empty());
        }
        self
    }

    /// Create a tool result turn.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: Some(Content::Text(content.into())),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::blank(Role::Tool)
        }
    }

    /// Textual content of this turn, empty when there is none.
    pub fn text(&self) -> String {
        self.content.as_ref().map(Content::text).unwrap_or_default()
    }
}

/// An ordered, append-only log of turns.
///
/// This is literally the context sent to the model on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    turns: Vec<Turn>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// All turns, in insertion order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, enforcing the tool-call pairing invariant.
    pub fn push(&mut self, turn: Turn) -> Result<(), ConversationError> {
        let pending = self.pending_tool_calls();
        match turn.role {
            Role::User => {
                if !pending.is_empty() {
                    return Err(ConversationError::PendingToolCalls { pending: pending.len() });
                }
                if turn.content.as_ref().is_none_or(Content::is_empty) {
                    return Err(ConversationError::EmptyUserTurn);
                }
            }
            Role::Assistant => {
                if !pending.is_empty() {
                    return Err(ConversationError::PendingToolCalls { pending: pending.len() });
                }
                let mut seen = HashSet::new();
                for call in &turn.tool_calls {
                    if !seen.insert(call.id.as_str()) {
                        return Err(ConversationError::DuplicateToolCallId(call.id.clone()));
                    }
                }
            }
            Role::Tool => {
                let id = turn.tool_call_id.as_deref().unwrap_or_default();
                if !pending.contains(&id) {
                    return Err(ConversationError::UnknownToolCallId(id.to_string()));
                }
            }
        }

        self.updated_at = Utc::now();
        self.turns.push(turn);
        Ok(())
    }

    /// Call ids of the most recent assistant turn that have no tool result yet.
    pub fn pending_tool_calls(&self) -> Vec<&str> {
        let Some(anchor) = self
            .turns
            .iter()
            .rposition(|t| t.role == Role::Assistant && !t.tool_calls.is_empty())
        else {
            return Vec::new();
        };

        let answered: HashSet<&str> = self.turns[anchor + 1..]
            .iter()
            .filter(|t| t.role == Role::Tool)
            .filter_map(|t| t.tool_call_id.as_deref())
            .collect();

        self.turns[anchor]
            .tool_calls
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }

    /// Drop every turn. The conversation keeps its id.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
