//! # Vigil Core
//!
//! Domain types, traits, and error definitions shared by every Vigil crate.
//! Nothing in here talks to the network or spawns a process — this crate
//! pins down the domain model the rest of the workspace implements against.
//!
//! The seams are traits: [`Provider`] for model backends, [`Tool`] for agent
//! capabilities. Implementations live in their own crates, so the dependency
//! graph points inward and tests can substitute scripted stand-ins for both.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, Role, Session, SessionId};
pub use provider::{ChatRequest, Provider};
pub use tool::{Params, Tool, ToolCall, ToolName, ToolOutput, ToolRegistry, ToolResult};
