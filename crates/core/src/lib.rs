//! # gdpilot Core
//!
//! Domain types, traits, and error definitions for the gdpilot editor
//! assistant. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here. Implementations live in their
//! respective crates:
//! - the chat-completions [`Transport`](transport::Transport) in `gdpilot-providers`
//! - the editor collaborators ([`host`]) in `gdpilot-host` (or in the editor itself)
//! - the built-in [`Tool`](tool::Tool)s in `gdpilot-tools`
//!
//! The orchestrator in `gdpilot-agent` only ever talks to these traits.

pub mod error;
pub mod host;
pub mod message;
pub mod tool;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use error::{ConversationError, Error, HostError, ProviderError, Result, ToolError};
pub use host::{HostContext, ProjectFs, SceneGraph, ScriptHost};
pub use message::{Content, ContentPart, Conversation, ConversationId, Role, ToolCallRequest, Turn};
pub use tool::{Tool, ToolArgs, ToolExecutor, ToolRegistry, ToolResult};
pub use transport::{ChatRequest, ResponseEnvelope, ToolDefinition, Transport, Usage};
