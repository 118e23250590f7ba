//! Persistence of the active provider choice

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::config::GalaxyConfig;
use crate::core::error::ConfigError;

/// Where the active provider id is remembered between runs
pub trait SettingsStore: Send + Sync {
    fn load_active(&self) -> Result<Option<String>, ConfigError>;
    fn save_active(&self, provider_id: &str) -> Result<(), ConfigError>;
}

/// Writes `providers.active` back into a TOML config file
///
/// The rest of the file is rewritten from the parsed configuration, so
/// unknown keys and comments are not preserved.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<GalaxyConfig, ConfigError> {
        if self.path.exists() {
            GalaxyConfig::load_from_toml(&self.path)
        } else {
            Ok(GalaxyConfig::default())
        }
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load_active(&self) -> Result<Option<String>, ConfigError> {
        Ok(self.read()?.providers.active)
    }

    fn save_active(&self, provider_id: &str) -> Result<(), ConfigError> {
        let mut config = self.read()?;
        config.providers.active = Some(provider_id.to_string());
        std::fs::write(&self.path, config.to_toml()?)?;
        tracing::debug!(path = %self.path.display(), provider_id, "Saved active provider");
        Ok(())
    }
}

/// Process-local store for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    active: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(provider_id: &str) -> Self {
        Self {
            active: Mutex::new(Some(provider_id.to_string())),
            saves: Mutex::new(0),
        }
    }

    /// Number of `save_active` calls so far
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_active(&self) -> Result<Option<String>, ConfigError> {
        Ok(self.active.lock().clone())
    }

    fn save_active(&self, provider_id: &str) -> Result<(), ConfigError> {
        *self.active.lock() = Some(provider_id.to_string());
        *self.saves.lock() += 1;
        Ok(())
    }
}
