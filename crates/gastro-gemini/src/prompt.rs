//! Extraction prompt and response schema.

use serde_json::{json, Value};

/// Instructions sent alongside the uploaded video.
pub const RECIPE_PROMPT: &str = r#"You are an expert chef. Watch the video and extract the recipe as JSON.
Include: title, description, ingredients (a list of objects with the fields "item" and "quantity"), steps (a list of strings), tags (a list of strings) and cooking_time.
Keep the language of the video for every text field.
IMPORTANT: if the video is NOT clearly about preparing food or a recipe (for example a dance, a vlog without cooking, a meme), return ONLY this JSON: {"error": "not_a_recipe"}.
Respond with the clean JSON only, without markdown code blocks."#;

/// Schema constraining the model output.
///
/// No field is required so the `{"error": "not_a_recipe"}` form stays valid.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "cooking_time": { "type": "STRING" },
            "ingredients": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "item": { "type": "STRING" },
                        "quantity": { "type": "STRING" }
                    },
                    "required": ["item"]
                }
            },
            "steps": { "type": "ARRAY", "items": { "type": "STRING" } },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "error": { "type": "STRING" }
        }
    })
}
