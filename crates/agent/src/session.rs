//! The chat loop orchestrator.

use gdpilot_config::AppConfig;
use gdpilot_core::message::{ContentPart, Conversation, Role, ToolCallRequest, Turn};
use gdpilot_core::tool::ToolExecutor;
use gdpilot_core::transport::{ChatRequest, ResponseEnvelope, Transport, Usage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::event::{ChatEvent, ExchangeOutcome, LoopState, NoticeLevel};

/// Result text recorded for a tool call that was cancelled before it ran.
pub const CANCELLED_CALL: &str = "Cancelled before execution.";

/// What the user submits: text, an image, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInput {
    pub text: Option<String>,
    pub image: Option<ContentPart>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ContentPart) -> Self {
        self.image = Some(image);
        self
    }
}

/// A cloneable handle for observing and cancelling the running exchange
/// from outside the session (a UI thread, a Ctrl-C handler).
#[derive(Clone, Default)]
pub struct ChatHandle {
    busy: Arc<AtomicBool>,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl ChatHandle {
    /// Whether an exchange is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Cancel the running exchange. Returns `false` (and does nothing) when idle.
    pub fn cancel(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin(&self, token: CancellationToken) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(token);
        self.busy.store(true, Ordering::SeqCst);
    }

    fn end(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Lowers the busy flag on every exit path of an exchange.
struct ExchangeGuard {
    handle: ChatHandle,
    events: Option<UnboundedSender<ChatEvent>>,
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        self.handle.end();
        if let Some(tx) = &self.events {
            let _ = tx.send(ChatEvent::State {
                state: LoopState::Idle,
            });
            let _ = tx.send(ChatEvent::Busy { busy: false });
        }
    }
}

/// One conversation with the model, plus everything needed to continue it.
///
/// `submit` takes `&mut self`, so a session runs at most one exchange at a
/// time; the [`ChatHandle`] is the only way to reach it while one runs.
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    executor: ToolExecutor,
    model: String,
    max_tokens: Option<u32>,
    max_round_trips: u32,
    tool_yield: Duration,
    conversation: Conversation,
    pending_image: Option<ContentPart>,
    last_usage: Option<Usage>,
    events: Option<UnboundedSender<ChatEvent>>,
    handle: ChatHandle,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>, executor: ToolExecutor, model: impl Into<String>) -> Self {
        Self {
            transport,
            executor,
            model: model.into(),
            max_tokens: None,
            max_round_trips: 10,
            tool_yield: Duration::from_millis(50),
            conversation: Conversation::new(),
            pending_image: None,
            last_usage: None,
            events: None,
            handle: ChatHandle::default(),
        }
    }

    /// Build a session with the model and loop settings from the config.
    pub fn from_config(transport: Arc<dyn Transport>, executor: ToolExecutor, config: &AppConfig) -> Self {
        Self::new(transport, executor, &config.model)
            .with_max_tokens(config.max_tokens)
            .with_max_round_trips(config.max_round_trips)
            .with_tool_yield(Duration::from_millis(config.tool_yield_ms))
    }

    /// Set the number of request/response round trips allowed per exchange.
    pub fn with_max_round_trips(mut self, max: u32) -> Self {
        self.max_round_trips = max.max(1);
        self
    }

    /// Set the max tokens requested per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Pause after announcing each tool call.
    pub fn with_tool_yield(mut self, pause: Duration) -> Self {
        self.tool_yield = pause;
        self
    }

    /// Send session events to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<ChatEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Token usage reported by the most recent response.
    pub fn last_usage(&self) -> Option<Usage> {
        self.last_usage
    }

    /// Stage an image for the next submission.
    pub fn attach_image(&mut self, image: ContentPart) {
        self.pending_image = Some(image);
    }

    pub fn pending_image(&self) -> Option<&ContentPart> {
        self.pending_image.as_ref()
    }

    /// Forget the conversation, any staged image and the last usage.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.pending_image = None;
        self.last_usage = None;
        info!("Conversation cleared");
        self.emit(ChatEvent::Notice {
            level: NoticeLevel::Info,
            message: "Conversation cleared.".into(),
        });
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ChatEvent::Notice {
            level,
            message: message.into(),
        });
    }

    /// Run one exchange: append the user turn, then request, dispatch tool
    /// calls and continue until the model answers, fails, is cancelled or
    /// runs out of round trips.
    ///
    /// An image staged with [`attach_image`](Self::attach_image) is used when
    /// the input carries none.
    pub async fn submit(&mut self, input: UserInput) -> Result<ExchangeOutcome, ChatError> {
        let text = input.text.filter(|t| !t.trim().is_empty());
        if text.is_none() && input.image.is_none() && self.pending_image.is_none() {
            return Err(ChatError::EmptyInput);
        }
        let image = input.image.or_else(|| self.pending_image.take());

        self.conversation.push(Turn::user_with_image(text.clone(), image))?;
        if let Some(text) = text {
            self.emit(ChatEvent::Transcript {
                role: Role::User,
                text,
            });
        }

        let token = CancellationToken::new();
        self.handle.begin(token.clone());
        let _guard = ExchangeGuard {
            handle: self.handle.clone(),
            events: self.events.clone(),
        };
        self.emit(ChatEvent::Busy { busy: true });

        info!(
            conversation_id = %self.conversation.id,
            turns = self.conversation.len(),
            "Exchange started"
        );

        let outcome = self.run_exchange(&token).await;

        match &outcome {
            ExchangeOutcome::Cancelled => info!("Exchange cancelled"),
            other => info!(outcome = ?other, turns = self.conversation.len(), "Exchange finished"),
        }
        self.emit(ChatEvent::Outcome {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    async fn run_exchange(&mut self, token: &CancellationToken) -> ExchangeOutcome {
        let definitions = self.executor.definitions();

        for round_trip in 1..=self.max_round_trips {
            if token.is_cancelled() {
                return self.cancelled();
            }

            self.emit(ChatEvent::State {
                state: LoopState::Sending,
            });
            let request = ChatRequest {
                model: self.model.clone(),
                turns: self.conversation.turns().to_vec(),
                tools: definitions.clone(),
                max_tokens: self.max_tokens,
            };

            debug!(round_trip, turns = request.turns.len(), "Sending request");
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return self.cancelled(),
                result = self.transport.send(request) => result,
            };
            debug!(
                round_trip,
                duration_ms = started.elapsed().as_millis() as u64,
                "Response received"
            );

            if token.is_cancelled() {
                return self.cancelled();
            }

            let envelope = match result {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(round_trip, error = %e, "Transport failure");
                    return self.failed(format!("Request failed: {e}"));
                }
            };

            match self.apply_response(envelope, token).await {
                Step::Finished(outcome) => return outcome,
                Step::Continue => {
                    self.emit(ChatEvent::State {
                        state: LoopState::Continuing,
                    });
                }
            }
        }

        warn!(
            round_trips = self.max_round_trips,
            "Round-trip limit reached with tool calls still coming"
        );
        self.notice(
            NoticeLevel::Warning,
            format!(
                "Stopped after {} round trips; the model was still calling tools.",
                self.max_round_trips
            ),
        );
        ExchangeOutcome::RoundTripLimit {
            round_trips: self.max_round_trips,
        }
    }

    /// Apply one response envelope to the conversation.
    ///
    /// A cancel stops the tool batch before the next call; calls that never
    /// ran still get a result turn so the conversation stays well-formed.
    async fn apply_response(&mut self, envelope: ResponseEnvelope, token: &CancellationToken) -> Step {
        if let Some(message) = envelope.error {
            warn!(error = %message, "Endpoint returned an error envelope");
            return Step::Finished(self.failed(format!("API error: {message}")));
        }

        if let Some(usage) = envelope.usage {
            self.last_usage = Some(usage);
            self.emit(ChatEvent::Usage { usage });
        }

        let Some(choice) = envelope.choices.into_iter().next() else {
            return Step::Finished(self.failed("The response contained no choices."));
        };

        let content = choice.content.filter(|c| !c.is_empty());

        if choice.tool_calls.is_empty() {
            let text = content.unwrap_or_default();
            let turn = Turn::assistant(text.clone()).with_reasoning(choice.reasoning);
            if let Err(e) = self.conversation.push(turn) {
                return Step::Finished(self.failed(e.to_string()));
            }
            self.emit(ChatEvent::Transcript {
                role: Role::Assistant,
                text,
            });
            return Step::Finished(ExchangeOutcome::Done);
        }

        let calls = choice.tool_calls.clone();
        let turn = Turn::assistant_with_calls(content.clone(), choice.tool_calls).with_reasoning(choice.reasoning);
        if let Err(e) = self.conversation.push(turn) {
            return Step::Finished(self.failed(format!("Rejected tool calls: {e}")));
        }
        if let Some(text) = content {
            self.emit(ChatEvent::Transcript {
                role: Role::Assistant,
                text,
            });
        }

        debug!(tool_count = calls.len(), "Executing tool calls");

        let mut remaining = calls.into_iter();
        while let Some(call) = remaining.next() {
            if token.is_cancelled() {
                return self.drop_calls(std::iter::once(call).chain(remaining));
            }

            self.emit(ChatEvent::ToolCallStarted {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            });
            if !self.tool_yield.is_zero() {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        self.emit(ChatEvent::ToolCallFinished {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            success: false,
                            duration_ms: 0,
                        });
                        return self.drop_calls(std::iter::once(call).chain(remaining));
                    }
                    _ = tokio::time::sleep(self.tool_yield) => {}
                }
            }

            let started = Instant::now();
            let result = self.executor.execute(&call.name, &call.arguments).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            debug!(tool = %call.name, success = result.success, duration_ms, "Tool finished");

            self.emit(ChatEvent::ToolCallFinished {
                id: call.id.clone(),
                name: call.name.clone(),
                success: result.success,
                duration_ms,
            });

            if let Err(e) = self.conversation.push(Turn::tool_result(call.id, result.output)) {
                return Step::Finished(self.failed(e.to_string()));
            }
        }

        if token.is_cancelled() {
            return Step::Finished(self.cancelled());
        }
        Step::Continue
    }

    /// Answer every unexecuted call with [`CANCELLED_CALL`] and end the exchange.
    fn drop_calls(&mut self, calls: impl Iterator<Item = ToolCallRequest>) -> Step {
        let mut dropped = 0;
        for call in calls {
            if let Err(e) = self.conversation.push(Turn::tool_result(call.id, CANCELLED_CALL)) {
                return Step::Finished(self.failed(e.to_string()));
            }
            dropped += 1;
        }
        info!(dropped, "Tool batch cancelled");
        Step::Finished(self.cancelled())
    }

    fn cancelled(&self) -> ExchangeOutcome {
        self.notice(NoticeLevel::Info, "Request cancelled.");
        ExchangeOutcome::Cancelled
    }

    fn failed(&self, message: impl Into<String>) -> ExchangeOutcome {
        let message = message.into();
        self.notice(NoticeLevel::Error, message.clone());
        ExchangeOutcome::Error { message }
    }
}

enum Step {
    Continue,
    Finished(ExchangeOutcome),
}
