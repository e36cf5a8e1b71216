//! Model adapters - implementations of the ModelClient port.

mod gemini;
mod mock;

pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::{MockFailure, MockModelClient, MockReply};
