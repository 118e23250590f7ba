//! Turn backend replies into command results
//!
//! Backends are asked for a single JSON object. Models like to wrap it in
//! prose or code fences, so the outermost braces are located first.

use serde::Deserialize;
use serde_json::Value;

use crate::command::transform::{CommandResult, Transformation};
use crate::llm::provider::ProviderError;

/// Reply shape requested from every backend
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyBody {
    transformations: Vec<Value>,
    feedback: String,
    warnings: Vec<String>,
}

/// Extract the JSON object from a reply (handles surrounding text)
pub fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// Parse a raw reply into a `CommandResult`
///
/// A reply without a JSON object is an `InvalidResponse`. Individual
/// transformations that do not parse become entries in `errors`; the rest
/// are kept.
pub fn parse_response(raw: &str, provider: &str) -> Result<CommandResult, ProviderError> {
    let json = extract_json(raw).ok_or_else(|| {
        ProviderError::invalid_response("no JSON object in reply").with_provider(provider)
    })?;

    let body: ReplyBody = serde_json::from_str(json).map_err(|e| {
        ProviderError::invalid_response(format!("malformed reply: {}", e))
            .with_provider(provider)
            .with_source(e)
    })?;

    let mut result = CommandResult {
        feedback: body.feedback,
        raw_response: raw.to_string(),
        warnings: body.warnings,
        provider: Some(provider.to_string()),
        ..CommandResult::default()
    };

    for (index, value) in body.transformations.into_iter().enumerate() {
        match serde_json::from_value::<Transformation>(value) {
            Ok(t) => result.transformations.push(t),
            Err(e) => result
                .errors
                .push(format!("transformation {}: could not parse: {}", index, e)),
        }
    }

    result.success = result.errors.is_empty();
    Ok(result)
}

/// System prompt for scene commands
pub const COMMAND_SYSTEM_PROMPT: &str = r#"You edit levels of a 3D platformer. The user describes a change to the
scene; you answer with the edits as JSON.

Each object in SCENE has an integer id, a name, a type and a position.
Refer to existing objects by id only. Use ids that appear in SCENE.

TRANSFORMATION KINDS:
- move: vector is the new position [x, y, z]
- rotate: vector is Euler angles in degrees [x, y, z]
- scale: vector is per-axis factors, all greater than zero
- set_property: properties is a map of name to value
- add: target is {"add": "<type>"}, vector is the position
- delete: no vector
- duplicate: vector is the position of the copy

OUTPUT FORMAT (JSON only, no explanation):
{
  "transformations": [
    {"target": {"object": 12}, "kind": "move", "vector": [0.0, 100.0, 0.0], "description": "raise goomba"}
  ],
  "feedback": "one sentence describing what changed",
  "warnings": []
}

If the command is unclear or refers to objects not in SCENE, return no
transformations and explain in feedback.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::transform::{TransformKind, TransformTarget};
    use crate::core::types::{ObjectId, Vec3};

    #[test]
    fn test_extract_json_simple() {
        let response = r#"{"feedback": "ok"}"#;
        assert_eq!(extract_json(response), Some(response));
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = "Sure, here you go:\n```json\n{\"feedback\": \"ok\"}\n```\nAnything else?";
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_extract_json_no_json() {
        assert!(extract_json("I don't understand that command").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn test_parse_full_reply() {
        let raw = r#"Here is the edit:
{
  "transformations": [
    {"target": {"object": 1}, "kind": "move", "vector": [0.0, 100.0, 0.0], "description": "raise goomba"},
    {"target": {"add": "coin"}, "kind": "add", "vector": [5.0, 0.0, 5.0]}
  ],
  "feedback": "Raised the goomba and added a coin"
}"#;
        let result = parse_response(raw, "anthropic").unwrap();
        assert!(result.success);
        assert_eq!(result.transformations.len(), 2);
        assert_eq!(result.transformations[0].target, TransformTarget::Object(ObjectId(1)));
        assert_eq!(result.transformations[0].vector, Some(Vec3::new(0.0, 100.0, 0.0)));
        assert_eq!(result.transformations[1].kind, TransformKind::Add);
        assert_eq!(result.feedback, "Raised the goomba and added a coin");
        assert_eq!(result.raw_response, raw);
        assert_eq!(result.provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn test_bad_transformation_is_recorded_not_fatal() {
        let raw = r#"{"transformations": [
            {"target": {"object": 1}, "kind": "teleport"},
            {"target": {"object": 2}, "kind": "delete"}
        ], "feedback": "done"}"#;
        let result = parse_response(raw, "openai").unwrap();
        assert!(!result.success);
        assert_eq!(result.transformations.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("transformation 0:"));
    }

    #[test]
    fn test_reply_without_json_is_invalid_response() {
        let err = parse_response("I cannot help with that", "ollama").unwrap_err();
        assert_eq!(err.kind, crate::llm::provider::ErrorKind::InvalidResponse);
        assert_eq!(err.provider.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_empty_object_is_a_successful_no_op() {
        let result = parse_response("{}", "openai").unwrap();
        assert!(result.success);
        assert!(result.transformations.is_empty());
    }
}
