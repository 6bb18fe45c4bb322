//! Transport trait: the abstraction over the chat-completions endpoint.
//!
//! A Transport knows how to send the whole conversation plus the tool
//! catalogue to the model and hand back the response envelope. It performs
//! exactly one request/response cycle: no retry, no backoff, no pruning.
//!
//! Implementations: OpenAI-compatible HTTP (`gdpilot-providers`), scripted
//! mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ToolCallRequest, Turn};

/// One outbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// The full accumulated conversation
    pub turns: Vec<Turn>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A tool definition sent to the model so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Token usage information from the most recent response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The message carried by one choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,

    /// `reasoning_content` or `reasoning`, whichever the endpoint sent
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A decoded response: either choices or a protocol-level error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Which model actually responded (may differ from requested)
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub choices: Vec<ResponseMessage>,

    #[serde(default)]
    pub usage: Option<Usage>,

    /// The endpoint's own `error.message`, if it sent one
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// A plain-text answer (no tool calls).
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ResponseMessage {
                content: Some(content.into()),
                ..ResponseMessage::default()
            }],
            ..Self::default()
        }
    }

    /// A tool-call answer with optional accompanying text.
    pub fn tool_calls(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            choices: vec![ResponseMessage {
                content,
                tool_calls,
                reasoning: None,
            }],
            ..Self::default()
        }
    }

    /// An error envelope, as the endpoint reports bad keys or quota problems.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// The first choice, which is the only one the loop ever reads.
    pub fn first_choice(&self) -> Option<&ResponseMessage> {
        self.choices.first()
    }
}

/// The core Transport trait.
///
/// The orchestrator calls `send()` without knowing which endpoint or wire
/// format sits behind it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A human-readable name for this transport (e.g., "openai").
    fn name(&self) -> &str;

    /// Send one request and wait for the complete response.
    async fn send(&self, request: ChatRequest) -> std::result::Result<ResponseEnvelope, ProviderError>;
}
