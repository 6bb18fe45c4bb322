use gdpilot_core::error::ConversationError;
use thiserror::Error;

/// Why a submission was refused before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("nothing to send: the message has no text and no image")]
    EmptyInput,

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}
