//! Gemini File API client.
//!
//! Extraction runs in four steps:
//! - resumable upload of the local video
//! - polling until the remote file is `ACTIVE` (or `FAILED`)
//! - `generateContent` with a JSON response schema
//! - deletion of the remote file, whatever the outcome

use std::path::Path;

use async_trait::async_trait;
use gastro_models::RecipeDraft;
use reqwest::{Client, Response};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::GeminiConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::prompt::{response_schema, RECIPE_PROMPT};
use crate::types::{
    strip_code_fence, Content, ExtractedRecipe, FileData, FileMetadata, FileState,
    GeminiRequest, GeminiResponse, GenerationConfig, Part, RemoteFile, StartUploadRequest,
    UploadResponse,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Extracts a structured recipe from a local video file.
#[async_trait]
pub trait RecipeExtractor: Send + Sync {
    async fn analyze(&self, video_path: &Path) -> ExtractResult<RecipeDraft>;
}

/// Gemini REST client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> ExtractResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("gastro-gemini/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ExtractResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> ExtractResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ExtractError::config("GEMINI_API_KEY not set"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn error_from_response(operation: &str, response: Response) -> ExtractError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ExtractError::from_http_status(status.as_u16(), format!("{} failed: {}", operation, body))
    }

    /// Upload a local file using the resumable upload protocol.
    pub async fn upload_file(&self, video_path: &Path) -> ExtractResult<RemoteFile> {
        let api_key = self.api_key()?;
        let bytes = tokio::fs::read(video_path).await?;
        let mime_type = mime_type_for(video_path);
        let display_name = video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());

        info!(
            path = %video_path.display(),
            size_bytes = bytes.len(),
            "Uploading video to Gemini"
        );

        let start = self
            .http
            .post(self.url("upload/v1beta/files"))
            .header(API_KEY_HEADER, api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: FileMetadata { display_name },
            })
            .send()
            .await?;

        if !start.status().is_success() {
            return Err(Self::error_from_response("upload start", start).await);
        }

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ExtractError::UploadFailed("missing upload URL header".into()))?;

        let response = self
            .http
            .post(&upload_url)
            .header(API_KEY_HEADER, api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("upload", response).await);
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(name = %uploaded.file.name, uri = %uploaded.file.uri, "File uploaded");
        Ok(uploaded.file)
    }

    /// Fetch the current metadata of a remote file.
    pub async fn get_file(&self, name: &str) -> ExtractResult<RemoteFile> {
        let response = self
            .http
            .get(self.url(&format!("v1beta/{}", name)))
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("get file", response).await);
        }

        Ok(response.json().await?)
    }

    /// Poll until the remote file is ready for inference.
    pub async fn wait_until_active(&self, name: &str) -> ExtractResult<RemoteFile> {
        let started = Instant::now();

        loop {
            let file = self.get_file(name).await?;
            debug!(name = %name, state = ?file.state, "File processing state");

            match file.state {
                FileState::Active => return Ok(file),
                FileState::Failed => {
                    return Err(ExtractError::ProcessingFailed(name.to_string()));
                }
                FileState::Processing | FileState::StateUnspecified => {}
            }

            if started.elapsed() + self.config.poll_interval > self.config.max_poll_wait {
                return Err(ExtractError::Timeout {
                    name: name.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Delete a remote file.
    pub async fn delete_file(&self, name: &str) -> ExtractResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("v1beta/{}", name)))
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("delete file", response).await);
        }
        Ok(())
    }

    /// Ask the model to extract a recipe from an active remote file.
    pub async fn generate_recipe(&self, file: &RemoteFile) -> ExtractResult<ExtractedRecipe> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: RECIPE_PROMPT.to_string(),
                    },
                    Part::File {
                        file_data: FileData {
                            mime_type: if file.mime_type.is_empty() {
                                "video/mp4".to_string()
                            } else {
                                file.mime_type.clone()
                            },
                            file_uri: file.uri.clone(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let response = self
            .http
            .post(self.url(&format!(
                "v1beta/models/{}:generateContent",
                self.config.model
            )))
            .header(API_KEY_HEADER, self.api_key()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("generateContent", response).await);
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let text = gemini_response
            .text()
            .ok_or_else(|| ExtractError::invalid_response("No content in Gemini response"))?;

        debug!("Gemini response: {}", text);

        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            ExtractError::invalid_response(format!(
                "Failed to parse recipe JSON: {}; raw text: {}",
                e, text
            ))
        })
    }

    async fn extract_from_remote(&self, file: &RemoteFile) -> ExtractResult<RecipeDraft> {
        let active = self.wait_until_active(&file.name).await?;
        let extracted = self.generate_recipe(&active).await?;

        if extracted.is_not_a_recipe() {
            info!(name = %file.name, "Video is not a recipe");
            return Err(ExtractError::NotARecipe);
        }
        if let Some(other) = extracted.error.as_deref() {
            return Err(ExtractError::invalid_response(format!(
                "model reported error: {}",
                other
            )));
        }

        Ok(extracted.into_draft(file.name.clone()))
    }
}

#[async_trait]
impl RecipeExtractor for GeminiClient {
    async fn analyze(&self, video_path: &Path) -> ExtractResult<RecipeDraft> {
        let span = info_span!(
            "gemini_analyze",
            path = %video_path.display(),
            model = %self.config.model
        );

        async {
            let file = self.upload_file(video_path).await?;
            let result = self.extract_from_remote(&file).await;

            if let Err(e) = self.delete_file(&file.name).await {
                warn!(name = %file.name, error = %e, "Failed to delete remote file");
            } else {
                debug!(name = %file.name, "Deleted remote file");
            }

            result
        }
        .instrument(span)
        .await
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        _ => "video/mp4",
    }
}
