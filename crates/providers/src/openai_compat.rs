//! OpenAI-compatible chat-completions transport.
//!
//! Works with: OpenAI, OpenRouter, DeepSeek, Ollama, vLLM, LM Studio and any
//! endpoint that speaks the `/chat/completions` wire format.
//!
//! Supports:
//! - Tool use / function calling
//! - Multimodal user turns (text + `image_url` data URIs)
//! - `reasoning_content` / `reasoning` on assistant messages
//! - Error envelopes (`{"error": {"message": ...}}`) on any status

use async_trait::async_trait;
use gdpilot_config::AppConfig;
use gdpilot_core::error::ProviderError;
use gdpilot_core::message::{Content, ContentPart, Role, ToolCallRequest, Turn};
use gdpilot_core::transport::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible transport.
///
/// The endpoint is the full chat-completions URL and is used verbatim.
pub struct OpenAiCompatTransport {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    send_reasoning: bool,
    client: reqwest::Client,
}

impl OpenAiCompatTransport {
    /// Create a new transport with the default 120 s timeout.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        Self::with_timeout(name, endpoint, api_key, std::time::Duration::from_secs(120))
    }

    pub fn with_timeout(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            send_reasoning: false,
            client,
        })
    }

    /// Build a transport from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let transport = Self::with_timeout(
            "openai-compat",
            &config.endpoint,
            config.api_key.clone(),
            std::time::Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(transport.with_send_reasoning(config.send_reasoning))
    }

    /// Echo assistant reasoning back as `reasoning_content`.
    pub fn with_send_reasoning(mut self, enabled: bool) -> Self {
        self.send_reasoning = enabled;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Convert our Turn types to OpenAI API format.
    fn to_api_messages(turns: &[Turn], send_reasoning: bool) -> Vec<ApiMessage> {
        turns
            .iter()
            .map(|t| ApiMessage {
                role: match t.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::Tool => "tool".into(),
                },
                content: t.content.as_ref().map(to_api_content),
                tool_calls: if t.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        t.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: t.tool_call_id.clone(),
                reasoning_content: if send_reasoning { t.reasoning.clone() } else { None },
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// The JSON body for one request.
    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.turns, self.send_reasoning),
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Decode a 2xx response body into the domain envelope.
    fn parse_envelope(body: &str) -> Result<ResponseEnvelope, ProviderError> {
        let api: ApiResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let error = api.error.as_ref().map(error_message);

        let choices = api
            .choices
            .into_iter()
            .map(|choice| {
                let message = choice.message;
                ResponseMessage {
                    content: message.content.map(|c| match c {
                        ApiContent::Text(text) => text,
                        ApiContent::Parts(parts) => parts
                            .into_iter()
                            .filter_map(|p| p.text)
                            .collect::<Vec<_>>()
                            .join(""),
                    }),
                    tool_calls: message
                        .tool_calls
                        .unwrap_or_default()
                        .into_iter()
                        .map(|tc| ToolCallRequest {
                            id: tc.id,
                            name: tc.function.name,
                            arguments: match tc.function.arguments {
                                serde_json::Value::String(s) => s,
                                serde_json::Value::Null => String::new(),
                                other => other.to_string(),
                            },
                        })
                        .collect(),
                    reasoning: message.reasoning_content.or(message.reasoning),
                }
            })
            .collect();

        let usage = api.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ResponseEnvelope {
            model: api.model,
            choices,
            usage,
            error,
        })
    }
}

fn to_api_content(content: &Content) -> ApiContent {
    match content {
        Content::Text(text) => ApiContent::Text(text.clone()),
        Content::Parts(parts) => ApiContent::Parts(
            parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => ApiContentPart {
                        r#type: "text".into(),
                        text: Some(text.clone()),
                        image_url: None,
                    },
                    ContentPart::Image { .. } => ApiContentPart {
                        r#type: "image_url".into(),
                        text: None,
                        image_url: p.data_uri().map(|url| ApiImageUrl { url }),
                    },
                })
                .collect(),
        ),
    }
}

/// `error` is an object with `message` on OpenAI; some proxies send a bare string.
fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

#[async_trait]
impl Transport for OpenAiCompatTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: ChatRequest) -> std::result::Result<ResponseEnvelope, ProviderError> {
        let body = self.build_body(&request);

        debug!(
            transport = %self.name,
            model = %request.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            warn!(status, body = %text, "Endpoint returned error");
            let message = serde_json::from_str::<ApiResponse>(&text)
                .ok()
                .and_then(|r| r.error.as_ref().map(error_message))
                .unwrap_or(text);

            if status == 401 || status == 403 {
                return Err(ProviderError::AuthenticationFailed(message));
            }
            return Err(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        Self::parse_envelope(&text)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    // `null` content is meaningful for tool-calling assistant turns
    content: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContentPart {
    r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<ApiImageUrl>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiImageUrl {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiResponseToolCall>>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseToolCall {
    id: String,
    function: ApiResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ApiResponseFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> OpenAiCompatTransport {
        OpenAiCompatTransport::new("test", "http://localhost:9/v1/chat/completions", Some("sk-test".into()))
            .unwrap()
    }

    #[test]
    fn message_conversion() {
        let turns = vec![Turn::user("Hello"), Turn::assistant("Hi")];
        let api_messages = OpenAiCompatTransport::to_api_messages(&turns, false);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "user");
        assert_eq!(api_messages[1].role, "assistant");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let turn = Turn::assistant_with_calls(
            None,
            vec![ToolCallRequest::new("call_1", "list_directory", r#"{"path":"res://"}"#)],
        );
        let api_msgs = OpenAiCompatTransport::to_api_messages(&[turn], false);
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "list_directory");
        assert_eq!(tc[0].r#type, "function");

        // Null content must still be serialized for tool-calling turns
        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        assert!(json.get("content").unwrap().is_null());
    }

    #[test]
    fn message_conversion_tool_response() {
        let turn = Turn::tool_result("call_1", "result data");
        let api_msgs = OpenAiCompatTransport::to_api_messages(&[turn], false);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn image_turn_becomes_image_url_part() {
        let turn = Turn::user_with_image(
            Some("what is this".into()),
            Some(ContentPart::Image {
                mime_type: "image/png".into(),
                data: "iVBORw0".into(),
            }),
        );
        let api_msgs = OpenAiCompatTransport::to_api_messages(&[turn], false);
        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/png;base64,iVBORw0");
    }

    #[test]
    fn reasoning_only_sent_when_enabled() {
        let turn = Turn::assistant("answer").with_reasoning(Some("thinking".into()));
        let off = OpenAiCompatTransport::to_api_messages(std::slice::from_ref(&turn), false);
        assert!(off[0].reasoning_content.is_none());
        let on = OpenAiCompatTransport::to_api_messages(&[turn], true);
        assert_eq!(on[0].reasoning_content.as_deref(), Some("thinking"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatTransport::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "read_file");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn body_contains_model_tools_and_max_tokens() {
        let request = ChatRequest {
            model: "gpt-4o".into(),
            turns: vec![Turn::user("hi")],
            tools: vec![ToolDefinition {
                name: "search_files".into(),
                description: "Search".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            max_tokens: Some(512),
        };
        let body = transport().build_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["tools"][0]["function"]["name"], "search_files");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn parse_text_response() {
        let body = r#"{
            "model": "gpt-4o-2024",
            "choices": [{"message": {"role": "assistant", "content": "Here are the files"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let env = OpenAiCompatTransport::parse_envelope(body).unwrap();
        assert_eq!(env.first_choice().unwrap().content.as_deref(), Some("Here are the files"));
        assert_eq!(env.usage.unwrap().total_tokens, 15);
        assert_eq!(env.model.as_deref(), Some("gpt-4o-2024"));
        assert!(env.error.is_none());
    }

    #[test]
    fn parse_tool_call_response() {
        let body = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"call_abc","type":"function","function":{"name":"list_directory","arguments":"{\"path\":\"res://scripts/\"}"}},
            {"id":"call_def","type":"function","function":{"name":"search_files","arguments":{"keyword":"player"}}}
        ]}}]}"#;
        let env = OpenAiCompatTransport::parse_envelope(body).unwrap();
        let choice = env.first_choice().unwrap();
        assert!(choice.content.is_none());
        assert_eq!(choice.tool_calls.len(), 2);
        assert_eq!(choice.tool_calls[0].id, "call_abc");
        assert_eq!(choice.tool_calls[0].arguments, r#"{"path":"res://scripts/"}"#);
        // Object-valued arguments are re-encoded to a JSON string
        assert_eq!(choice.tool_calls[1].arguments, r#"{"keyword":"player"}"#);
    }

    #[test]
    fn parse_reasoning_variants() {
        let env = OpenAiCompatTransport::parse_envelope(
            r#"{"choices":[{"message":{"content":"a","reasoning_content":"r1"}}]}"#,
        )
        .unwrap();
        assert_eq!(env.first_choice().unwrap().reasoning.as_deref(), Some("r1"));

        let env = OpenAiCompatTransport::parse_envelope(
            r#"{"choices":[{"message":{"content":"a","reasoning":"r2"}}]}"#,
        )
        .unwrap();
        assert_eq!(env.first_choice().unwrap().reasoning.as_deref(), Some("r2"));
    }

    #[test]
    fn parse_error_envelope() {
        let env = OpenAiCompatTransport::parse_envelope(r#"{"error":{"message":"invalid_api_key"}}"#).unwrap();
        assert_eq!(env.error.as_deref(), Some("invalid_api_key"));
        assert!(env.choices.is_empty());

        let env = OpenAiCompatTransport::parse_envelope(r#"{"error":"quota exceeded"}"#).unwrap();
        assert_eq!(env.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn parse_garbage_is_malformed() {
        let err = OpenAiCompatTransport::parse_envelope("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn empty_key_means_no_auth() {
        let t = OpenAiCompatTransport::new("local", "http://localhost:11434/v1/chat/completions", Some(String::new()))
            .unwrap();
        assert!(t.api_key.is_none());
    }

    // --- Live HTTP against a local stub ---

    mod http {
        use super::*;
        use axum::extract::State;
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::post;
        use axum::{Json, Router};
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Stub {
            status: StatusCode,
            reply: serde_json::Value,
            seen: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
        }

        async fn handler(
            State(stub): State<Stub>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            stub.seen.lock().unwrap().push((auth, body));
            (stub.status, Json(stub.reply.clone()))
        }

        async fn serve(stub: Stub) -> String {
            let app = Router::new()
                .route("/v1/chat/completions", post(handler))
                .with_state(stub);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}/v1/chat/completions")
        }

        fn request() -> ChatRequest {
            ChatRequest {
                model: "gpt-4o".into(),
                turns: vec![Turn::user("List files in res://scripts/")],
                tools: vec![],
                max_tokens: Some(256),
            }
        }

        #[tokio::test]
        async fn posts_bearer_auth_and_decodes() {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let url = serve(Stub {
                status: StatusCode::OK,
                reply: serde_json::json!({
                    "choices": [{"message": {"content": "Here are the files..."}}],
                    "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
                }),
                seen: seen.clone(),
            })
            .await;

            let transport = OpenAiCompatTransport::new("stub", url, Some("sk-live".into())).unwrap();
            let env = transport.send(request()).await.unwrap();
            assert_eq!(env.first_choice().unwrap().content.as_deref(), Some("Here are the files..."));
            assert_eq!(env.usage.unwrap().total_tokens, 7);

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].0.as_deref(), Some("Bearer sk-live"));
            assert_eq!(seen[0].1["max_tokens"], 256);
            assert_eq!(seen[0].1["messages"][0]["role"], "user");
        }

        #[tokio::test]
        async fn unauthorized_maps_to_auth_error() {
            let url = serve(Stub {
                status: StatusCode::UNAUTHORIZED,
                reply: serde_json::json!({"error": {"message": "invalid_api_key"}}),
                seen: Arc::new(Mutex::new(Vec::new())),
            })
            .await;

            let transport = OpenAiCompatTransport::new("stub", url, Some("bad".into())).unwrap();
            let err = transport.send(request()).await.unwrap_err();
            match err {
                ProviderError::AuthenticationFailed(msg) => assert_eq!(msg, "invalid_api_key"),
                other => panic!("expected auth failure, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn server_error_maps_to_api_error() {
            let url = serve(Stub {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                reply: serde_json::json!({"error": {"message": "overloaded"}}),
                seen: Arc::new(Mutex::new(Vec::new())),
            })
            .await;

            let transport = OpenAiCompatTransport::new("stub", url, None).unwrap();
            let err = transport.send(request()).await.unwrap_err();
            assert!(matches!(
                err,
                ProviderError::ApiError { status_code: 500, ref message } if message == "overloaded"
            ));
        }

        #[tokio::test]
        async fn connection_refused_is_network_error() {
            let transport =
                OpenAiCompatTransport::new("stub", "http://127.0.0.1:1/v1/chat/completions", None).unwrap();
            let err = transport.send(request()).await.unwrap_err();
            assert!(matches!(err, ProviderError::Network(_) | ProviderError::Timeout(_)));
        }
    }
}
