//! Object resolution - turns text references into ranked scene objects
//!
//! "the goombas near the start", "Coin1", "all enemies" -> concrete records
//! with confidence scores. Six independent strategies score every record;
//! their candidates are merged per object and ranked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::command::constants::*;
use crate::command::result::{MatchCandidate, ResolutionResult};
use crate::command::similarity::{contains_either, similarity};
use crate::core::types::Vec3;
use crate::scene::record::{ObjectRecord, ObjectType};
use crate::scene::snapshot::SceneSnapshot;

/// Counters shared by resolvers on any thread
#[derive(Debug, Default)]
pub struct ResolverStats {
    resolutions: AtomicU64,
    failures: AtomicU64,
    candidates: AtomicU64,
}

impl ResolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, result: &ResolutionResult<'_>) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        if result.success {
            self.candidates
                .fetch_add(result.len() as u64, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn candidates(&self) -> u64 {
        self.candidates.load(Ordering::Relaxed)
    }
}

/// Trimmed, lower-cased reference, `None` when nothing is left
pub(crate) fn normalize(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

pub(crate) const EMPTY_REFERENCE: &str = "reference must not be empty";

pub(crate) fn no_match_message(reference: &str) -> String {
    format!("no objects found matching: {}", reference.trim())
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

/// Resolves references against one snapshot
///
/// Read-only; any number of resolvers may share a snapshot across threads.
#[derive(Debug, Clone)]
pub struct ObjectResolver<'a> {
    pub(crate) snapshot: &'a SceneSnapshot,
    pub(crate) origin: Vec3,
    pub(crate) stats: Option<Arc<ResolverStats>>,
}

impl<'a> ObjectResolver<'a> {
    pub fn new(snapshot: &'a SceneSnapshot) -> Self {
        Self {
            snapshot,
            origin: Vec3::ZERO,
            stats: None,
        }
    }

    /// Reference point for "near the start" style proximity scoring
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_stats(mut self, stats: Arc<ResolverStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn snapshot(&self) -> &'a SceneSnapshot {
        self.snapshot
    }

    pub(crate) fn finish(&self, result: ResolutionResult<'a>) -> ResolutionResult<'a> {
        if let Some(stats) = &self.stats {
            stats.record(&result);
        }
        result
    }

    /// Resolve a single reference
    pub fn resolve(&self, reference: &str) -> ResolutionResult<'a> {
        let Some(needle) = normalize(reference) else {
            return self.finish(ResolutionResult::failure(EMPTY_REFERENCE));
        };

        let candidates = self.match_all_strategies(&needle);
        let result = ResolutionResult::ranked(candidates, no_match_message(reference));

        tracing::debug!(
            reference = needle.as_str(),
            matches = result.len(),
            ambiguous = result.needs_disambiguation,
            "Resolved reference"
        );
        self.finish(result)
    }

    /// Candidates from every strategy, unmerged
    pub(crate) fn match_all_strategies(&self, needle: &str) -> Vec<MatchCandidate<'a>> {
        let mut candidates = Vec::new();
        let spatial_keyword = START_KEYWORDS.iter().any(|k| needle.contains(k));

        for record in self.snapshot.objects() {
            let name = record.name().to_lowercase();

            if let Some(c) = exact_name(record, &name, needle) {
                candidates.push(c);
            }
            if let Some(c) = fuzzy_name(record, &name, needle) {
                candidates.push(c);
            }
            if let Some(c) = display_name(record, needle) {
                candidates.push(c);
            }
            if let Some(c) = classification(record, needle) {
                candidates.push(c);
            }
            if let Some(c) = tag(record, needle) {
                candidates.push(c);
            }
            if spatial_keyword {
                if let Some(c) = start_proximity(record, self.origin) {
                    candidates.push(c);
                }
            }
        }

        candidates
    }

    /// Objects near to, or far from, an explicit point
    ///
    /// "far"/"distant" selects objects beyond the near radius; anything else
    /// ("near", "close", or no keyword) selects objects inside it.
    pub fn resolve_spatial(&self, reference: &str, origin: Vec3) -> ResolutionResult<'a> {
        let Some(needle) = normalize(reference) else {
            return self.finish(ResolutionResult::failure(EMPTY_REFERENCE));
        };

        let far = words(&needle).any(|w| FAR_KEYWORDS.contains(&w))
            && !words(&needle).any(|w| NEAR_KEYWORDS.contains(&w));

        let candidates: Vec<_> = self
            .snapshot
            .objects()
            .iter()
            .filter_map(|record| {
                let distance = record.distance_to(origin);
                if far {
                    (distance > NEAR_RADIUS).then(|| {
                        MatchCandidate::new(
                            record,
                            (distance / FAR_SCALE).min(1.0),
                            format!("far from reference point ({:.1} units)", distance),
                        )
                    })
                } else {
                    (distance < NEAR_RADIUS).then(|| {
                        MatchCandidate::new(
                            record,
                            1.0 - distance / NEAR_RADIUS,
                            format!("near reference point ({:.1} units)", distance),
                        )
                    })
                }
            })
            .collect();

        let message = format!(
            "no objects found {} ({:.1}, {:.1}, {:.1})",
            if far { "far from" } else { "near" },
            origin.x,
            origin.y,
            origin.z
        );
        self.finish(ResolutionResult::ranked(candidates, message))
    }
}

// === STRATEGIES ===

fn exact_name<'a>(record: &'a ObjectRecord, name: &str, needle: &str) -> Option<MatchCandidate<'a>> {
    (name == needle).then(|| MatchCandidate::new(record, EXACT_NAME_CONFIDENCE, "exact name match"))
}

fn fuzzy_name<'a>(record: &'a ObjectRecord, name: &str, needle: &str) -> Option<MatchCandidate<'a>> {
    let score = similarity(needle, name);
    if score >= FUZZY_NAME_THRESHOLD {
        Some(MatchCandidate::new(
            record,
            NAME_WEIGHT * score,
            format!("fuzzy name match ({:.2})", score),
        ))
    } else if contains_either(name, needle) && score >= PARTIAL_NAME_THRESHOLD {
        Some(MatchCandidate::new(
            record,
            NAME_WEIGHT * score,
            format!("partial name match ({:.2})", score),
        ))
    } else {
        None
    }
}

fn display_name<'a>(record: &'a ObjectRecord, needle: &str) -> Option<MatchCandidate<'a>> {
    let display = record.display_name().to_lowercase();
    contains_either(&display, needle).then(|| {
        MatchCandidate::new(
            record,
            DISPLAY_NAME_WEIGHT * similarity(needle, &display),
            format!("display name match: {}", record.display_name()),
        )
    })
}

fn classification<'a>(record: &'a ObjectRecord, needle: &str) -> Option<MatchCandidate<'a>> {
    let type_name = record.object_type().as_str();
    contains_either(type_name, needle).then(|| {
        MatchCandidate::new(
            record,
            TYPE_WEIGHT * similarity(needle, type_name),
            format!("type match: {}", type_name),
        )
    })
}

fn tag<'a>(record: &'a ObjectRecord, needle: &str) -> Option<MatchCandidate<'a>> {
    record
        .tags()
        .iter()
        .filter_map(|t| {
            let lower = t.to_lowercase();
            contains_either(&lower, needle).then(|| (similarity(needle, &lower), t))
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(score, t)| MatchCandidate::new(record, TAG_WEIGHT * score, format!("tag match: {}", t)))
}

fn start_proximity<'a>(record: &'a ObjectRecord, origin: Vec3) -> Option<MatchCandidate<'a>> {
    if *record.object_type() == ObjectType::Start || record.has_tag(crate::scene::naming::PLAYER_TAG) {
        return Some(MatchCandidate::new(record, START_POINT_CONFIDENCE, "start point"));
    }

    let distance = record.distance_to(origin);
    (distance < START_PROXIMITY_RADIUS).then(|| {
        MatchCandidate::new(
            record,
            START_PROXIMITY_WEIGHT * (1.0 - distance / START_PROXIMITY_RADIUS),
            format!("near start ({:.1} units)", distance),
        )
    })
}
