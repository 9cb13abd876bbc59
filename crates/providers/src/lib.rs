//! Model provider implementations for Vigil.
//!
//! All providers implement the `vigil_core::Provider` trait. Ollama is
//! the only backend: the whole point is local inference with no API
//! keys and no data leaving the machine.

pub mod ollama;

pub use ollama::OllamaProvider;
