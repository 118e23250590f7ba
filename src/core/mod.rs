pub mod config;
pub mod error;
pub mod types;

pub use config::GalaxyConfig;
pub use error::{ConfigError, GalaxyError, Result, SceneError};
pub use types::{ObjectId, Vec3};
