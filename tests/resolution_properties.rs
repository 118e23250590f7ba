use galaxy_intent::command::{levenshtein_distance, similarity, ObjectResolver};
use galaxy_intent::core::types::{ObjectId, Vec3};
use galaxy_intent::scene::{ObjectRecord, SceneSnapshot};
use proptest::prelude::*;

const NAMES: [&str; 8] = [
    "Goomba1", "Goomba2", "Coin", "CoinRing", "Mario", "Lift", "StarPiece", "Koopa",
];
const TYPES: [&str; 4] = ["enemy", "collectible", "start", "mappart"];

fn scene(picks: &[(usize, usize, f32)]) -> SceneSnapshot {
    let objects = picks
        .iter()
        .enumerate()
        .map(|(i, (name, ty, x))| {
            ObjectRecord::simple(
                i as i32,
                NAMES[name % NAMES.len()],
                TYPES[ty % TYPES.len()],
                Vec3::new(*x, 0.0, 0.0),
            )
            .unwrap()
            .with_tags(["shiny"])
        })
        .collect();
    SceneSnapshot::new("PropGalaxy", None, objects).unwrap()
}

fn picks() -> impl Strategy<Value = Vec<(usize, usize, f32)>> {
    proptest::collection::vec((0..8usize, 0..4usize, -300.0f32..300.0), 1..24)
}

proptest! {
    #[test]
    fn prop_similarity_is_symmetric(a in "[a-z0-9 ]{0,12}", b in "[a-z0-9 ]{0,12}") {
        prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        prop_assert_eq!(levenshtein_distance(&a, &b), levenshtein_distance(&b, &a));
    }

    #[test]
    fn prop_similarity_in_unit_range(a in "\\PC{0,10}", b in "\\PC{0,10}") {
        let s = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn prop_results_are_ranked_and_deduplicated(
        picks in picks(),
        query in prop::sample::select(vec!["goomba", "coin", "the start", "shiny", "enemy", "lift", "zzz"]),
    ) {
        let snapshot = scene(&picks);
        let result = ObjectResolver::new(&snapshot).resolve(query);

        if result.success {
            prop_assert!(!result.candidates.is_empty());
            prop_assert!(result.error.is_none());
            for pair in result.candidates.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
            let mut ids: Vec<ObjectId> = result.object_ids();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), result.len());
            for c in &result.candidates {
                prop_assert!((0.0..=1.0).contains(&c.confidence));
            }
            if result.needs_disambiguation {
                prop_assert!(result.candidates[0].confidence - result.candidates[1].confidence < 0.1);
            }
        } else {
            prop_assert!(result.candidates.is_empty());
            prop_assert!(result.error.as_deref().map_or(false, |e| !e.is_empty()));
        }
    }

    #[test]
    fn prop_exact_name_is_top_with_full_confidence(picks in picks(), index in 0..24usize) {
        let snapshot = scene(&picks);
        let target = &snapshot.objects()[index % snapshot.len()];
        let result = ObjectResolver::new(&snapshot).resolve(&target.name().to_uppercase());

        let top = result.top().unwrap();
        prop_assert_eq!(top.confidence, 1.0);
        prop_assert!(result.object_ids().contains(&target.id()));
    }

    #[test]
    fn prop_blank_input_always_fails(picks in picks(), blank in "[ \\t\\n]{0,6}") {
        let snapshot = scene(&picks);
        let resolver = ObjectResolver::new(&snapshot);
        prop_assert!(!resolver.resolve(&blank).success);
        prop_assert!(!resolver.resolve_multiple(&blank).success);
        prop_assert!(!resolver.resolve_spatial(&blank, Vec3::ZERO).success);
    }
}
