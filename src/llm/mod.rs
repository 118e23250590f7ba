//! Language-model plumbing
//!
//! Scene projection for prompts, HTTP backends, reply parsing and the
//! failover orchestrator that ties them together.

pub mod client;
pub mod context;
pub mod orchestrator;
pub mod parser;
pub mod provider;
pub mod settings;

pub use client::HttpProvider;
pub use context::{DetailLevel, SceneProjector};
pub use orchestrator::{ProviderHealth, ProviderOrchestrator};
pub use provider::{CommandRequest, ErrorKind, Provider, ProviderError};
pub use settings::{MemorySettingsStore, SettingsStore, TomlSettingsStore};
