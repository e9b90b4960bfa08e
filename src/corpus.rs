use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const UNKNOWN: &str = "unknown";

/// One corpus entry. Missing text fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub motion_description: String,
    pub visual_description: String,
    pub narration: String,
    pub scene_environment: String,
}

impl Scene {
    pub fn new(motion: &str, visual: &str, narration: &str, environment: &str) -> Self {
        Self {
            motion_description: motion.to_string(),
            visual_description: visual.to_string(),
            narration: narration.to_string(),
            scene_environment: environment.to_string(),
        }
    }

    /// The environment label, with empty mapped to `"unknown"`.
    pub fn environment(&self) -> &str {
        if self.scene_environment.is_empty() {
            UNKNOWN
        } else {
            &self.scene_environment
        }
    }

    fn from_value(index: usize, value: &Value) -> AppResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            AppError::input(format!("scene {index} is not an object"))
        })?;
        let field = |key: &str| -> String {
            match obj.get(key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    tracing::warn!(scene = index, field = key, value = %other, "non-text field ignored");
                    String::new()
                }
            }
        };
        Ok(Self {
            motion_description: field("motionDescription"),
            visual_description: field("visualDescription"),
            narration: field("narration"),
            scene_environment: field("sceneEnvironment"),
        })
    }
}

// ---------------------------------------------------------------------------
// Shape resolution
// ---------------------------------------------------------------------------

type Strategy = fn(&Value) -> Option<&Vec<Value>>;

fn whole_document(doc: &Value) -> Option<&Vec<Value>> {
    doc.as_array()
}

fn scenes_field(doc: &Value) -> Option<&Vec<Value>> {
    doc.get("scenes")?.as_array()
}

fn parsed_scenes_field(doc: &Value) -> Option<&Vec<Value>> {
    doc.get("parsed")?.get("scenes")?.as_array()
}

fn first_top_level_array(doc: &Value) -> Option<&Vec<Value>> {
    doc.as_object()?.values().find_map(Value::as_array)
}

/// Tried in order; the first strategy that yields an array wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("document", whole_document),
    ("scenes", scenes_field),
    ("parsed.scenes", parsed_scenes_field),
    ("first-array", first_top_level_array),
];

pub fn resolve_scenes(doc: &Value) -> AppResult<Vec<Scene>> {
    let (name, items) = STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(doc).map(|items| (*name, items)))
        .ok_or_else(|| AppError::input("no scene array found in document"))?;
    tracing::info!(strategy = name, scenes = items.len(), "corpus resolved");
    items
        .iter()
        .enumerate()
        .map(|(i, v)| Scene::from_value(i, v))
        .collect()
}

pub fn parse_corpus(data: &str) -> AppResult<Vec<Scene>> {
    let doc: Value = serde_json::from_str(data)?;
    resolve_scenes(&doc)
}

pub fn load_corpus(path: &Path) -> AppResult<Vec<Scene>> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::usage(format!("failed to read {}: {e}", path.display())))?;
    parse_corpus(&data).map_err(|e| AppError::new(e.kind(), format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn motions(scenes: &[Scene]) -> Vec<&str> {
        scenes.iter().map(|s| s.motion_description.as_str()).collect()
    }

    #[test]
    fn bare_array_is_used_directly() {
        let doc = json!([{"motionDescription": "static"}]);
        assert_eq!(motions(&resolve_scenes(&doc).unwrap()), vec!["static"]);
    }

    #[test]
    fn scenes_field_beats_parsed_scenes() {
        let doc = json!({
            "parsed": {"scenes": [{"motionDescription": "parsed"}]},
            "scenes": [{"motionDescription": "top"}]
        });
        assert_eq!(motions(&resolve_scenes(&doc).unwrap()), vec!["top"]);
    }

    #[test]
    fn parsed_scenes_used_when_no_scenes_field() {
        let doc = json!({
            "meta": {"model": "x"},
            "parsed": {"scenes": [{"motionDescription": "nested"}]}
        });
        assert_eq!(motions(&resolve_scenes(&doc).unwrap()), vec!["nested"]);
    }

    #[test]
    fn falls_back_to_first_array_in_document_order() {
        let doc: Value = serde_json::from_str(
            r#"{"title": "t", "zeta": [{"motionDescription": "z"}], "alpha": [{"motionDescription": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(motions(&resolve_scenes(&doc).unwrap()), vec!["z"]);
    }

    #[test]
    fn non_array_scenes_field_falls_through() {
        let doc = json!({"scenes": "oops", "items": [{"narration": "n"}]});
        let scenes = resolve_scenes(&doc).unwrap();
        assert_eq!(scenes[0].narration, "n");
    }

    #[test]
    fn unresolvable_shape_is_fatal() {
        let err = resolve_scenes(&json!({"title": "no arrays here"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(resolve_scenes(&json!("text")).is_err());
    }

    #[test]
    fn missing_and_null_fields_default() {
        let doc = json!([{"narration": null, "sceneEnvironment": ""}, {"visualDescription": 42}]);
        let scenes = resolve_scenes(&doc).unwrap();
        assert_eq!(scenes[0], Scene::default());
        assert_eq!(scenes[0].environment(), UNKNOWN);
        assert_eq!(scenes[1].visual_description, "");
    }

    #[test]
    fn non_object_scene_is_rejected() {
        let err = resolve_scenes(&json!([{"narration": "ok"}, 7])).unwrap_err();
        assert!(err.message().contains("scene 1"));
    }

    #[test]
    fn invalid_json_is_input_error() {
        let err = parse_corpus("[\n  {\"narration\": }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.message().contains("line 2"), "{}", err.message());
    }
}
