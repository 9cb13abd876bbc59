//! Security module for Vigil — destructive-command interception and the
//! human confirmation gate.
//!
//! Provides:
//! - **SafetyGate**: ordered, case-insensitive dangerous-pattern classification
//! - **ConfirmationGate**: the single blocking human checkpoint behind which
//!   overridden destructive commands sit

pub mod confirm;
pub mod gate;

pub use confirm::{
    confirmation_warning, ConfirmationGate, PresetConfirmation, StdinConfirmation, CONFIRM_PROMPT,
    CONFIRM_TOKEN,
};
pub use gate::{PatternError, SafetyGate, Verdict, BLOCKED_REASON, DANGEROUS_PATTERNS};
