//! Scene snapshot model
//!
//! Immutable records of every object in a galaxy, the indexed snapshot that
//! groups them, and the accessor through which the editor supplies them.

pub mod naming;
pub mod record;
pub mod snapshot;
pub mod source;

pub use record::{ObjectRecord, ObjectType, PropertyValue, RawObject};
pub use snapshot::SceneSnapshot;
pub use source::{build_snapshot, ContextBuilder, SceneDocument, SceneSource};
