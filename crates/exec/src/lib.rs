//! # Vigil Exec
//!
//! The safe command-execution engine: process spawning with concurrent
//! dual-stream capture, deadline enforcement, bounded retries with
//! exponential backoff, and an append-only history of every attempt.
//!
//! The pipeline for one logical command is
//! `SafetyGate → ConfirmationGate → attempt loop → CommandHistory`,
//! driven by [`CommandRunner::run_with_retry`]. A single attempt
//! ([`Executor::execute`]) never returns an error: blocked, cancelled,
//! timed-out, spawn-failed, and non-zero outcomes are all ordinary
//! [`CommandResult`] states.

pub mod executor;
pub mod history;
pub mod request;
pub mod result;
pub mod runner;

pub use executor::{Executor, OutputLine, StreamKind};
pub use history::CommandHistory;
pub use request::{CommandRequest, DEFAULT_BACKOFF_FACTOR, DEFAULT_TIMEOUT_SECS};
pub use result::{truncate_stream, CommandResult, MAX_STREAM_BYTES};
pub use runner::CommandRunner;
