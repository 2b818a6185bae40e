//! quill library crate
//!
//! Exposes the response-to-action pipeline and its collaborators so
//! tests and external tooling can exercise them without going through
//! CLI startup.

pub mod client;
pub mod config;
pub mod pipeline;
pub mod prompt;
pub mod repl;
pub mod session;
pub mod util;
