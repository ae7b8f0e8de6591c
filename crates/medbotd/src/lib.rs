//! MedBot daemon library - exposes modules for testing.

pub mod chat;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod routes;
pub mod server;
