//! Display names and semantic tags derived from internal object names
//!
//! Level files use internal (mostly Japanese) object names. Commands use the
//! names players know, so the builder attaches a display name and category
//! tags to every record.

use crate::scene::record::ObjectType;

/// Prefix of the tag recording an object's layer
pub const LAYER_TAG_PREFIX: &str = "layer_";

/// Tag carried by player start points
pub const PLAYER_TAG: &str = "player";

/// (internal name prefix, display name, category)
const NAME_TABLE: &[(&str, &str, &str)] = &[
    ("patakuribo", "Paragoomba", "enemy"),
    ("kuribo", "Goomba", "enemy"),
    ("nokonoko", "Koopa Troopa", "enemy"),
    ("karon", "Dry Bones", "enemy"),
    ("teresa", "Boo", "enemy"),
    ("jugem", "Lakitu", "enemy"),
    ("hammerbros", "Hammer Bro", "enemy"),
    ("bombhei", "Bob-omb", "enemy"),
    ("powerstar", "Power Star", "collectible"),
    ("starpiece", "Star Bit", "collectible"),
    ("bluecoin", "Blue Coin", "collectible"),
    ("purplecoin", "Purple Coin", "collectible"),
    ("coin", "Coin", "collectible"),
    ("kinopio", "Toad", "npc"),
    ("superspindriver", "Launch Star", "launcher"),
    ("woodbox", "Wooden Box", "breakable"),
];

/// Substrings marking a category when the name table has no entry
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("goomba", "enemy"),
    ("koopa", "enemy"),
    ("coin", "collectible"),
    ("star", "collectible"),
    ("lift", "platform"),
    ("platform", "platform"),
    ("block", "platform"),
    ("planet", "planet"),
];

/// Display name for an internal object name, when one is known
pub fn display_name_for(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    NAME_TABLE
        .iter()
        .find(|(prefix, _, _)| lower.starts_with(prefix))
        .map(|(_, display, _)| *display)
}

fn category_for(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    NAME_TABLE
        .iter()
        .find(|(prefix, _, _)| lower.starts_with(prefix))
        .map(|(_, _, category)| *category)
        .or_else(|| {
            CATEGORY_KEYWORDS
                .iter()
                .find(|(keyword, _)| lower.contains(keyword))
                .map(|(_, category)| *category)
        })
}

/// Append derived tags to `tags`, skipping ones already present
pub fn derive_tags(name: &str, object_type: &ObjectType, layer: &str, tags: &mut Vec<String>) {
    let mut push = |tag: String| {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    };

    push(object_type.as_str().to_string());

    if let Some(category) = category_for(name) {
        push(category.to_string());
    }

    if *object_type == ObjectType::Start {
        push(PLAYER_TAG.to_string());
    }

    if !layer.is_empty() {
        push(format!("{}{}", LAYER_TAG_PREFIX, layer.to_lowercase()));
    }
}
