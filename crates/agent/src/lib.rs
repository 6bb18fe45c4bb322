//! The chat loop.
//!
//! One exchange runs like this:
//!
//! 1. **Receive** the user's text and optional image
//! 2. **Send** the whole conversation plus the tool catalogue to the endpoint
//! 3. **If tool calls**: execute them in order, append the results, go to 2
//! 4. **If text**: append the answer and stop
//!
//! The loop also stops on a transport failure, an error envelope, user
//! cancellation, or when the round-trip bound is reached.

pub mod error;
pub mod event;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use error::ChatError;
pub use event::{ChatEvent, ExchangeOutcome, LoopState, NoticeLevel};
pub use session::{ChatHandle, ChatSession, UserInput};
