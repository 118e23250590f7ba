//! Command pipeline
//!
//! Text reference -> ObjectResolver -> ResolutionResult, and backend reply ->
//! CommandResult -> validated Transformations.

pub mod constants;
pub mod phrases;
pub mod resolver;
pub mod result;
pub mod similarity;
pub mod transform;

pub use resolver::{ObjectResolver, ResolverStats};
pub use result::{MatchCandidate, ResolutionResult};
pub use similarity::{levenshtein_distance, similarity};
pub use transform::{
    validate_transformations, CommandResult, Severity, TransformIssue, TransformKind,
    TransformTarget, Transformation,
};
