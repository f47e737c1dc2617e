use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::ScriptRequest;
use crate::state::{Scene, Speaker};
use crate::{Result, StudioError};

pub const MIN_SCENES: usize = 3;
pub const MAX_SCENES: usize = 5;

/// Scene as written by the script model, before it gets an id and status
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneDraft {
    title: String,
    visual_prompt: String,
    audio_script: String,
    speaker: Speaker,
}

impl ScriptRequest {
    pub fn for_pitch(pitch: &str) -> Self {
        Self {
            instruction: script_instruction(pitch),
            response_schema: script_response_schema(),
        }
    }
}

fn script_instruction(pitch: &str) -> String {
    format!(
        r#"Act as a master cinematographer and scriptwriter. Create a short movie script based on: "{}".
Format the output as a JSON array of scenes.
Each scene must have: "title", "visualPrompt" (highly detailed description for a high-quality 3D render/Blender style), "audioScript" (dialogue or narration), and "speaker" (either "Joe" or "Jane").
Limit to {}-{} scenes total for a short cinematic experience."#,
        pitch, MIN_SCENES, MAX_SCENES
    )
}

/// Response schema constraining the script model to an array of scenes
pub fn script_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "visualPrompt": { "type": "STRING" },
                "audioScript": { "type": "STRING" },
                "speaker": { "type": "STRING", "enum": ["Joe", "Jane"] }
            },
            "required": ["title", "visualPrompt", "audioScript", "speaker"]
        }
    })
}

/// Strip a markdown code fence the model may wrap around its JSON
fn clean_script_response(content: &str) -> &str {
    let content = content.trim();

    if content.starts_with("```") {
        if let (Some(start), Some(end)) = (content.find('\n'), content.rfind("```")) {
            if end > start {
                return content[start + 1..end].trim();
            }
        }
    }

    content
}

/// Parse and validate the script model's answer into pending scenes, keeping
/// the order the model returned them in
pub fn parse_script(content: &str) -> Result<Vec<Scene>> {
    let cleaned = clean_script_response(content);

    let drafts: Vec<SceneDraft> = serde_json::from_str(cleaned)
        .map_err(|e| StudioError::Parse(format!("invalid script JSON: {}", e)))?;

    if !(MIN_SCENES..=MAX_SCENES).contains(&drafts.len()) {
        return Err(StudioError::Parse(format!(
            "expected {}-{} scenes, got {}",
            MIN_SCENES,
            MAX_SCENES,
            drafts.len()
        )));
    }

    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            if draft.visual_prompt.trim().is_empty() || draft.audio_script.trim().is_empty() {
                return Err(StudioError::Parse(format!(
                    "scene {} has an empty visualPrompt or audioScript",
                    index + 1
                )));
            }

            debug!("Scene {}: '{}' ({})", index + 1, draft.title, draft.speaker);
            Ok(Scene::new(
                draft.title,
                draft.visual_prompt,
                draft.audio_script,
                draft.speaker,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SceneStatus;
    use std::collections::HashSet;

    fn scene_json(title: &str, speaker: &str) -> String {
        format!(
            r#"{{"title":"{}","visualPrompt":"Wide shot of {}","audioScript":"Narration for {}","speaker":"{}"}}"#,
            title, title, title, speaker
        )
    }

    fn script_json(titles: &[&str]) -> String {
        let scenes: Vec<String> = titles.iter().map(|t| scene_json(t, "Joe")).collect();
        format!("[{}]", scenes.join(","))
    }

    #[test]
    fn test_parse_valid_script() {
        let scenes = parse_script(&script_json(&["Dawn", "Chase", "Dusk"])).unwrap();

        assert_eq!(scenes.len(), 3);
        let titles: Vec<&str> = scenes.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Dawn", "Chase", "Dusk"]);
        assert!(scenes.iter().all(|s| s.status == SceneStatus::Pending));
        assert!(scenes.iter().all(|s| s.video.is_none() && s.audio.is_none()));
        assert_eq!(scenes[0].visual_prompt, "Wide shot of Dawn");
        assert_eq!(scenes[0].speaker, Speaker::Joe);

        let ids: HashSet<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_parse_fenced_script() {
        let fenced = format!("```json\n{}\n```", script_json(&["A", "B", "C", "D"]));
        assert_eq!(parse_script(&fenced).unwrap().len(), 4);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = parse_script("this is not json").unwrap_err();
        assert!(matches!(err, StudioError::Parse(_)));
    }

    #[test]
    fn test_rejects_missing_field() {
        let content = r#"[
            {"title":"A","visualPrompt":"v","audioScript":"a","speaker":"Joe"},
            {"title":"B","visualPrompt":"v","speaker":"Jane"},
            {"title":"C","visualPrompt":"v","audioScript":"a","speaker":"Joe"}
        ]"#;
        assert!(matches!(parse_script(content), Err(StudioError::Parse(_))));
    }

    #[test]
    fn test_rejects_unknown_speaker() {
        let scenes = vec![scene_json("A", "Joe"), scene_json("B", "Bob"), scene_json("C", "Jane")];
        let content = format!("[{}]", scenes.join(","));
        assert!(matches!(parse_script(&content), Err(StudioError::Parse(_))));
    }

    #[test]
    fn test_rejects_non_string_field() {
        let content = r#"[
            {"title":1,"visualPrompt":"v","audioScript":"a","speaker":"Joe"},
            {"title":"B","visualPrompt":"v","audioScript":"a","speaker":"Jane"},
            {"title":"C","visualPrompt":"v","audioScript":"a","speaker":"Joe"}
        ]"#;
        assert!(matches!(parse_script(content), Err(StudioError::Parse(_))));
    }

    #[test]
    fn test_rejects_scene_count_out_of_range() {
        assert!(matches!(parse_script("[]"), Err(StudioError::Parse(_))));
        assert!(parse_script(&script_json(&["A", "B"])).is_err());
        assert!(parse_script(&script_json(&["A", "B", "C", "D", "E", "F"])).is_err());
        assert!(parse_script(&script_json(&["A", "B", "C", "D", "E"])).is_ok());
    }

    #[test]
    fn test_rejects_blank_prompt() {
        let content = r#"[
            {"title":"A","visualPrompt":"   ","audioScript":"a","speaker":"Joe"},
            {"title":"B","visualPrompt":"v","audioScript":"a","speaker":"Jane"},
            {"title":"C","visualPrompt":"v","audioScript":"a","speaker":"Joe"}
        ]"#;
        assert!(matches!(parse_script(content), Err(StudioError::Parse(_))));
    }

    #[test]
    fn test_request_carries_pitch_and_schema() {
        let request = ScriptRequest::for_pitch("A dragon wakes up");
        assert!(request.instruction.contains("\"A dragon wakes up\""));
        assert!(request.instruction.contains("3-5 scenes"));
        assert_eq!(request.response_schema["type"], "ARRAY");
        assert_eq!(
            request.response_schema["items"]["properties"]["speaker"]["enum"],
            json!(["Joe", "Jane"])
        );
    }
}
