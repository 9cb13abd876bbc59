//! The conversation loop — the heart of Vigil.
//!
//! Each turn follows a **two-pass** cycle:
//!
//! 1. **Receive** a user message and send the conversation to the model
//! 2. **If the reply carries a fenced tool request**: run that one tool,
//!    inject the formatted results back in as a user message, and ask the
//!    model to analyze them
//! 3. **Return** the reply to the user, with the tool results and the
//!    analysis folded in
//!
//! At most one tool call runs per turn. The injected results stay in the
//! session, so later turns can build on earlier command output.

pub mod loop_runner;
pub mod prompt;

pub use loop_runner::{ConversationLoop, format_tool_result};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
