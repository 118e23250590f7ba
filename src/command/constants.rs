//! Resolution scoring constants - all tunable values in one place
//!
//! Strategy weights multiply a string similarity in [0, 1]; the product is
//! the candidate's confidence.

// Strategy weights
pub const EXACT_NAME_CONFIDENCE: f32 = 1.0;
pub const NAME_WEIGHT: f32 = 0.8;
pub const DISPLAY_NAME_WEIGHT: f32 = 0.7;
pub const TYPE_WEIGHT: f32 = 0.6;
pub const TAG_WEIGHT: f32 = 0.5;

// Name matching thresholds
pub const FUZZY_NAME_THRESHOLD: f32 = 0.6;
pub const PARTIAL_NAME_THRESHOLD: f32 = 0.4;

// Spatial keywords ("the goomba near the start")
pub const START_POINT_CONFIDENCE: f32 = 0.9;
pub const START_PROXIMITY_RADIUS: f32 = 50.0;
pub const START_PROXIMITY_WEIGHT: f32 = 0.5;
pub const START_KEYWORDS: [&str; 2] = ["start", "beginning"];

// Explicit spatial resolution
pub const NEAR_RADIUS: f32 = 100.0;
pub const FAR_SCALE: f32 = 200.0;
pub const NEAR_KEYWORDS: [&str; 2] = ["near", "close"];
pub const FAR_KEYWORDS: [&str; 2] = ["far", "distant"];

// Phrase handling
pub const SPATIAL_CONNECTORS: [&str; 3] = [" near ", " close ", " far "];
pub const EVERYTHING_WORDS: [&str; 3] = ["all", "everything", "everyone"];

/// Top-two confidence gap below which a match needs confirmation
pub const DISAMBIGUATION_GAP: f32 = 0.1;
