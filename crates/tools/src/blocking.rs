//! Project filesystem calls are synchronous; tools run them off the async workers.

use gdpilot_core::error::ToolError;

/// Run `f` on the blocking thread pool on behalf of `tool_name`.
pub(crate) async fn on_blocking_pool<T, F>(tool_name: &str, f: F) -> Result<T, ToolError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: e.to_string(),
        })
}
