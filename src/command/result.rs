//! Match candidates and resolution results

use std::cmp::Ordering;

use ahash::AHashMap;

use crate::command::constants::DISAMBIGUATION_GAP;
use crate::core::types::ObjectId;
use crate::scene::record::ObjectRecord;

/// One object a reference might point at
#[derive(Debug, Clone)]
pub struct MatchCandidate<'a> {
    pub record: &'a ObjectRecord,
    /// Always within [0, 1]
    pub confidence: f32,
    /// Diagnostic only
    pub reason: String,
}

impl<'a> MatchCandidate<'a> {
    pub fn new(record: &'a ObjectRecord, confidence: f32, reason: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            record,
            confidence,
            reason: reason.into(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.record.id()
    }
}

/// Outcome of resolving one text reference
///
/// On failure `candidates` is empty and `error` is set. On success
/// `candidates` is non-empty and ordered by descending confidence.
#[derive(Debug, Clone)]
pub struct ResolutionResult<'a> {
    pub success: bool,
    pub candidates: Vec<MatchCandidate<'a>>,
    pub needs_disambiguation: bool,
    pub error: Option<String>,
}

impl<'a> ResolutionResult<'a> {
    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "resolution failed".into();
        }
        Self {
            success: false,
            candidates: Vec::new(),
            needs_disambiguation: false,
            error: Some(message),
        }
    }

    /// Keep the best candidate per object, rank, and flag close top scores
    pub fn ranked(candidates: Vec<MatchCandidate<'a>>, empty_message: impl Into<String>) -> Self {
        let mut merged = dedup_by_object(candidates);
        sort_descending(&mut merged);

        if merged.is_empty() {
            return Self::failure(empty_message);
        }

        let needs_disambiguation =
            merged.len() >= 2 && merged[0].confidence - merged[1].confidence < DISAMBIGUATION_GAP;

        Self {
            success: true,
            candidates: merged,
            needs_disambiguation,
            error: None,
        }
    }

    /// Rank without merging and without a disambiguation signal
    ///
    /// Used where the caller asked for many objects on purpose ("all goombas",
    /// lists), so several equal scores are expected.
    pub fn collection(mut candidates: Vec<MatchCandidate<'a>>, empty_message: impl Into<String>) -> Self {
        sort_descending(&mut candidates);
        if candidates.is_empty() {
            return Self::failure(empty_message);
        }
        Self {
            success: true,
            candidates,
            needs_disambiguation: false,
            error: None,
        }
    }

    pub fn top(&self) -> Option<&MatchCandidate<'a>> {
        self.candidates.first()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.candidates.iter().map(MatchCandidate::id).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Best candidate per object id, first-seen order
pub(crate) fn dedup_by_object(candidates: Vec<MatchCandidate<'_>>) -> Vec<MatchCandidate<'_>> {
    let mut slots: AHashMap<ObjectId, usize> = AHashMap::with_capacity(candidates.len());
    let mut merged: Vec<MatchCandidate<'_>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.get(&candidate.id()) {
            Some(&slot) => {
                if candidate.confidence > merged[slot].confidence {
                    merged[slot] = candidate;
                }
            }
            None => {
                slots.insert(candidate.id(), merged.len());
                merged.push(candidate);
            }
        }
    }

    merged
}

/// Stable, so equal scores keep snapshot order
fn sort_descending(candidates: &mut [MatchCandidate<'_>]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;

    fn records() -> Vec<ObjectRecord> {
        (1..=3)
            .map(|i| ObjectRecord::simple(i, &format!("Obj{}", i), "level", Vec3::ZERO).unwrap())
            .collect()
    }

    #[test]
    fn test_confidence_clamped() {
        let recs = records();
        assert_eq!(MatchCandidate::new(&recs[0], 1.7, "x").confidence, 1.0);
        assert_eq!(MatchCandidate::new(&recs[0], -0.2, "x").confidence, 0.0);
        assert_eq!(MatchCandidate::new(&recs[0], f32::NAN, "x").confidence, 0.0);
    }

    #[test]
    fn test_ranked_keeps_best_per_object() {
        let recs = records();
        let result = ResolutionResult::ranked(
            vec![
                MatchCandidate::new(&recs[0], 0.3, "weak"),
                MatchCandidate::new(&recs[1], 0.5, "mid"),
                MatchCandidate::new(&recs[0], 0.9, "strong"),
            ],
            "none",
        );
        assert!(result.success);
        assert_eq!(result.len(), 2);
        assert_eq!(result.candidates[0].reason, "strong");
        assert!(!result.needs_disambiguation);
    }

    #[test]
    fn test_close_scores_need_disambiguation() {
        let recs = records();
        let result = ResolutionResult::ranked(
            vec![
                MatchCandidate::new(&recs[0], 0.70, "a"),
                MatchCandidate::new(&recs[1], 0.65, "b"),
            ],
            "none",
        );
        assert!(result.needs_disambiguation);
    }

    #[test]
    fn test_empty_is_failure() {
        let result = ResolutionResult::ranked(Vec::new(), "no objects found matching: x");
        assert!(!result.success);
        assert!(result.candidates.is_empty());
        assert_eq!(result.error.as_deref(), Some("no objects found matching: x"));
    }

    #[test]
    fn test_collection_keeps_duplicates() {
        let recs = records();
        let result = ResolutionResult::collection(
            vec![
                MatchCandidate::new(&recs[0], 0.5, "a"),
                MatchCandidate::new(&recs[0], 0.9, "b"),
            ],
            "none",
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result.candidates[0].reason, "b");
        assert!(!result.needs_disambiguation);
    }
}
