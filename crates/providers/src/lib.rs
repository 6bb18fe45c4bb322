//! Chat-completions transports for gdpilot.
//!
//! All transports implement the `gdpilot_core::Transport` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatTransport;

use gdpilot_config::AppConfig;
use gdpilot_core::error::ProviderError;
use std::sync::Arc;

/// Build the configured transport.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn gdpilot_core::Transport>, ProviderError> {
    let transport = OpenAiCompatTransport::from_config(config)?;
    tracing::debug!(endpoint = %transport.endpoint(), "Transport configured");
    Ok(Arc::new(transport))
}
