//! Session events for the UI.
//!
//! `ChatEvent` is everything a front end needs to render an exchange:
//! transcript text, status notices, tool progress, usage and the final
//! outcome. Events are fire-and-forget; a dropped receiver never stalls the
//! loop.

use gdpilot_core::message::Role;
use gdpilot_core::transport::Usage;
use serde::{Deserialize, Serialize};

/// Where the chat loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    /// A request is in flight
    Sending,
    /// Tool results were appended; the next request follows
    Continuing,
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeOutcome {
    /// The model answered without tool calls.
    Done,

    /// The user cancelled; nothing was appended for the in-flight request.
    Cancelled,

    /// Transport failure or an error envelope from the endpoint.
    Error { message: String },

    /// The model was still calling tools when the round-trip bound was hit.
    RoundTripLimit { round_trips: u32 },
}

impl ExchangeOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Severity of a status notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Events emitted by a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Text to append to the visible transcript.
    Transcript { role: Role, text: String },

    /// A status line (errors, limits, cancellation).
    Notice { level: NoticeLevel, message: String },

    /// A tool call is about to run.
    ToolCallStarted {
        id: String,
        name: String,
        arguments: String,
    },

    /// A tool call finished.
    ToolCallFinished {
        id: String,
        name: String,
        success: bool,
        duration_ms: u64,
    },

    /// Last-known token usage.
    Usage { usage: Usage },

    /// The session became busy or idle.
    Busy { busy: bool },

    State { state: LoopState },

    /// The exchange is over.
    Outcome { outcome: ExchangeOutcome },
}

impl ChatEvent {
    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Transcript { .. } => "transcript",
            Self::Notice { .. } => "notice",
            Self::ToolCallStarted { .. } => "tool_call_started",
            Self::ToolCallFinished { .. } => "tool_call_finished",
            Self::Usage { .. } => "usage",
            Self::Busy { .. } => "busy",
            Self::State { .. } => "state",
            Self::Outcome { .. } => "outcome",
        }
    }
}
