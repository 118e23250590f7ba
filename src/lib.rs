//! Galaxy Intent - natural language object resolution for level editing

pub mod cache;
pub mod command;
pub mod core;
pub mod llm;
pub mod scene;
pub mod spatial;
