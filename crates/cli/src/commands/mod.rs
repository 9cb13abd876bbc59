//! Subcommand implementations.

pub mod chat;
pub mod gateway;
pub mod init;
pub mod run_cmd;
pub mod scan;
pub mod status;
