//! Shared test helpers for session tests.

use async_trait::async_trait;
use gdpilot_core::error::ProviderError;
use gdpilot_core::message::ToolCallRequest;
use gdpilot_core::transport::{ChatRequest, ResponseEnvelope, Transport, Usage};
use std::sync::Mutex;
use tokio::sync::Notify;

/// A transport that returns a sequence of scripted responses.
///
/// Each call to `send` returns the next response in the queue and records
/// the request. Panics if more calls are made than responses provided.
pub struct ScriptedTransport {
    responses: Mutex<Vec<Result<ResponseEnvelope, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<ResponseEnvelope, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn envelopes(envelopes: Vec<ResponseEnvelope>) -> Self {
        Self::new(envelopes.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: ChatRequest) -> Result<ResponseEnvelope, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();
        assert!(
            !responses.is_empty(),
            "ScriptedTransport: no more responses (call #{})",
            requests.len() + 1
        );
        requests.push(request);
        responses.remove(0)
    }
}

/// A transport whose model never stops calling tools.
#[derive(Default)]
pub struct AlwaysToolCalls {
    calls: Mutex<usize>,
}

impl AlwaysToolCalls {
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Transport for AlwaysToolCalls {
    fn name(&self) -> &str {
        "always_tools"
    }

    async fn send(&self, _request: ChatRequest) -> Result<ResponseEnvelope, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        Ok(ResponseEnvelope::tool_calls(
            None,
            vec![ToolCallRequest::new(
                format!("call_{calls}"),
                "list_directory",
                r#"{"path":"res://"}"#,
            )],
        ))
    }
}

/// A transport that parks every request until released.
#[derive(Default)]
pub struct GatedTransport {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl Transport for GatedTransport {
    fn name(&self) -> &str {
        "gated"
    }

    async fn send(&self, _request: ChatRequest) -> Result<ResponseEnvelope, ProviderError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ResponseEnvelope::text("too late"))
    }
}

pub fn usage(total: u32) -> Usage {
    Usage {
        prompt_tokens: total / 2,
        completion_tokens: total - total / 2,
        total_tokens: total,
    }
}

/// Helper to create a tool call.
pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, name, serde_json::to_string(&args).unwrap())
}
