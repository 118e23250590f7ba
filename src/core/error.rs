use thiserror::Error;

use crate::core::types::ObjectId;

#[derive(Error, Debug)]
pub enum GalaxyError {
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::llm::provider::ProviderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Validation failures raised while materialising scene records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("object {0} has an empty name")]
    EmptyName(ObjectId),

    #[error("object {id} has a non-finite {field}")]
    NonFinite { id: ObjectId, field: &'static str },

    #[error("duplicate object id: {0}")]
    DuplicateId(ObjectId),

    #[error("scope name must not be empty")]
    EmptyScope,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, GalaxyError>;
