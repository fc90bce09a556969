//! Wire types for the Gemini REST API.

use gastro_models::{Ingredient, RecipeDraft};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel the model returns for videos that are not recipes.
pub const NOT_A_RECIPE_SENTINEL: &str = "not_a_recipe";

// =============================================================================
// File API
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct StartUploadRequest {
    pub file: FileMetadata,
}

#[derive(Debug, Serialize)]
pub(crate) struct FileMetadata {
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub file: RemoteFile,
}

/// A file stored in the Gemini File API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    StateUnspecified,
    Processing,
    Active,
    Failed,
}

// =============================================================================
// generateContent
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Part {
    Text { text: String },
    File { file_data: FileData },
}

#[derive(Debug, Serialize)]
pub(crate) struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    pub response_mime_type: String,
    #[serde(rename = "responseSchema")]
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: ResponseContent,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// =============================================================================
// Model output
// =============================================================================

/// Recipe JSON as produced by the model.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractedRecipe {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cooking_time: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtractedRecipe {
    pub fn is_not_a_recipe(&self) -> bool {
        self.error.as_deref() == Some(NOT_A_RECIPE_SENTINEL)
    }

    pub fn into_draft(self, video_file_id: impl Into<String>) -> RecipeDraft {
        RecipeDraft {
            title: self.title,
            description: self.description,
            cooking_time: self.cooking_time,
            ingredients: self.ingredients,
            steps: self.steps,
            tags: self.tags,
            video_file_id: video_file_id.into(),
        }
    }
}

/// Accept strings, numbers or null for free-text fields.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_sentinel_detection() {
        let parsed: ExtractedRecipe = serde_json::from_str(r#"{"error":"not_a_recipe"}"#).unwrap();
        assert!(parsed.is_not_a_recipe());

        let parsed: ExtractedRecipe = serde_json::from_str(r#"{"title":"Soup"}"#).unwrap();
        assert!(!parsed.is_not_a_recipe());
    }

    #[test]
    fn test_numeric_cooking_time_is_accepted() {
        let parsed: ExtractedRecipe =
            serde_json::from_str(r#"{"title":"Soup","cooking_time":30}"#).unwrap();
        assert_eq!(parsed.cooking_time, "30");
    }

    #[test]
    fn test_file_part_serialization() {
        let part = Part::File {
            file_data: FileData {
                mime_type: "video/mp4".into(),
                file_uri: "https://files/abc".into(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["file_data"]["file_uri"], "https://files/abc");
    }

    #[test]
    fn test_file_state_parsing() {
        let file: RemoteFile =
            serde_json::from_str(r#"{"name":"files/x","uri":"u","state":"ACTIVE"}"#).unwrap();
        assert_eq!(file.state, FileState::Active);

        let file: RemoteFile = serde_json::from_str(r#"{"name":"files/x"}"#).unwrap();
        assert_eq!(file.state, FileState::StateUnspecified);
    }
}
