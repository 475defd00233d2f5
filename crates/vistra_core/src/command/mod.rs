//! Textual command and property protocol.
//!
//! # Responsibility
//! - Parse the line-oriented protocol and dispatch it onto the scene.
//! - Keep replay/history state for scripted and interactive callers.

pub mod engine;
pub mod parser;
