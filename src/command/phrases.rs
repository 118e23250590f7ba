//! Multi-object phrasing on top of single resolution
//!
//! Checked in order: "all <type>", comma lists, plurals, then a plain
//! single reference.

use crate::command::constants::{
    EVERYTHING_WORDS, NAME_WEIGHT, SPATIAL_CONNECTORS, TAG_WEIGHT, TYPE_WEIGHT,
};
use crate::command::resolver::{no_match_message, normalize, ObjectResolver, EMPTY_REFERENCE};
use crate::command::result::{MatchCandidate, ResolutionResult};
use crate::command::similarity::similarity;
use crate::scene::record::ObjectRecord;

/// Ends in "s" but not "ss"
pub fn is_plural(word: &str) -> bool {
    word.len() > 1 && word.ends_with('s') && !word.ends_with("ss")
}

/// "enemies" -> "enemy", "goombas" -> "goomba"
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{}y", stem)
    } else if is_plural(word) {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Split "goombas near the start" into ("goombas", "near the start")
pub fn split_spatial(phrase: &str) -> Option<(&str, &str)> {
    SPATIAL_CONNECTORS
        .iter()
        .filter_map(|connector| phrase.find(connector))
        .min()
        .map(|at| (phrase[..at].trim(), phrase[at..].trim()))
}

impl<'a> ObjectResolver<'a> {
    /// Resolve a reference that may name several objects
    pub fn resolve_multiple(&self, reference: &str) -> ResolutionResult<'a> {
        let Some(needle) = normalize(reference) else {
            return self.finish(ResolutionResult::failure(EMPTY_REFERENCE));
        };

        if EVERYTHING_WORDS.contains(&needle.as_str()) {
            let all = self
                .snapshot
                .objects()
                .iter()
                .map(|r| MatchCandidate::new(r, 1.0, "all objects"))
                .collect();
            return self.finish(ResolutionResult::collection(all, no_match_message(reference)));
        }

        if let Some(rest) = needle.strip_prefix("all ") {
            let rest = rest.trim();
            let rest = rest.strip_prefix("the ").unwrap_or(rest).trim();

            let type_phrase = match split_spatial(rest) {
                Some((type_phrase, spatial)) => {
                    // Spatial narrowing is not applied; only the type filters.
                    tracing::debug!(type_phrase, spatial, "Ignoring spatial clause of 'all' phrase");
                    type_phrase
                }
                None => rest,
            };

            let matches = self.type_matches(type_phrase);
            return self.finish(ResolutionResult::collection(matches, no_match_message(reference)));
        }

        if needle.contains(',') {
            return self.resolve_list(&needle, reference);
        }

        if is_plural(&needle) {
            let singular = singularize(&needle);
            let mut matches = self.type_matches(&singular);
            if matches.is_empty() {
                matches = self.type_matches(&needle);
            }
            if !matches.is_empty() {
                return self.finish(ResolutionResult::collection(matches, no_match_message(reference)));
            }
        }

        self.resolve(reference)
    }

    fn resolve_list(&self, needle: &str, reference: &str) -> ResolutionResult<'a> {
        let mut matches = Vec::new();

        for segment in needle
            .split(',')
            .flat_map(|s| s.split(" and "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let segment = segment.strip_prefix("and ").unwrap_or(segment);
            let result = ResolutionResult::ranked(
                self.match_all_strategies(segment),
                no_match_message(segment),
            );
            if result.success {
                matches.extend(result.candidates);
            } else {
                tracing::debug!(segment, "List segment matched nothing");
            }
        }

        self.finish(ResolutionResult::collection(matches, no_match_message(reference)))
    }

    /// Every record whose name, type or tags contain the phrase (singular or as given)
    pub(crate) fn type_matches(&self, phrase: &str) -> Vec<MatchCandidate<'a>> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Vec::new();
        }

        let singular = singularize(phrase);
        let forms: Vec<&str> = if singular == phrase {
            vec![phrase]
        } else {
            vec![singular.as_str(), phrase]
        };

        self.snapshot
            .objects()
            .iter()
            .filter_map(|record| best_type_match(record, &forms))
            .collect()
    }
}

fn best_type_match<'a>(record: &'a ObjectRecord, forms: &[&str]) -> Option<MatchCandidate<'a>> {
    let name = record.name().to_lowercase();
    let type_name = record.object_type().as_str();
    let mut best: Option<(f32, String)> = None;

    let mut consider = |score: f32, reason: String| {
        if best.as_ref().map_or(true, |(b, _)| score > *b) {
            best = Some((score, reason));
        }
    };

    for form in forms {
        if name.contains(form) {
            consider(NAME_WEIGHT * similarity(form, &name), format!("name contains '{}'", form));
        }
        if type_name.contains(form) {
            consider(TYPE_WEIGHT * similarity(form, type_name), format!("type {}", type_name));
        }
        for t in record.tags() {
            let lower = t.to_lowercase();
            if lower.contains(form) {
                consider(TAG_WEIGHT * similarity(form, &lower), format!("tag {}", t));
            }
        }
    }

    best.map(|(score, reason)| MatchCandidate::new(record, score, reason))
}
