//! Tests for the Gemini client against a mock server.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{GeminiClient, RecipeExtractor};
use crate::config::GeminiConfig;
use crate::error::ExtractError;

// =============================================================================
// Test Helpers
// =============================================================================

const FILE_NAME: &str = "files/abc123";
const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn test_client(server: &MockServer) -> GeminiClient {
    let config = GeminiConfig::default()
        .with_api_key("test-key")
        .with_base_url(server.uri())
        .with_poll_interval(Duration::from_millis(10))
        .with_max_poll_wait(Duration::from_millis(200));
    GeminiClient::new(config).unwrap()
}

fn video_file() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("video_1.mp4");
    std::fs::write(&path, b"fake mp4 bytes").unwrap();
    (dir, path)
}

fn file_json(state: &str) -> serde_json::Value {
    json!({
        "name": FILE_NAME,
        "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
        "mimeType": "video/mp4",
        "state": state
    })
}

fn candidate(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(header("x-goog-api-key", "test-key"))
        .and(header("X-Goog-Upload-Command", "start"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-goog-upload-url", format!("{}/upload-session/1", server.uri()).as_str()),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload-session/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "file": file_json("PROCESSING") })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_state(server: &MockServer, state: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{}", FILE_NAME)))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json(state)))
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path(format!("/v1beta/{}", FILE_NAME)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

// =============================================================================
// Extraction Flow
// =============================================================================

#[tokio::test]
async fn test_analyze_returns_draft() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_state(&server, "ACTIVE").await;
    mount_delete(&server).await;

    let recipe = json!({
        "title": "Tortilla de patatas",
        "description": "La clásica",
        "cooking_time": "40 min",
        "ingredients": [{ "item": "huevos", "quantity": "6" }, { "item": "sal" }],
        "steps": ["Pelar las patatas", "Freír", "Cuajar"],
        "tags": ["española"]
    });
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&recipe.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, video) = video_file();
    let draft = test_client(&server).analyze(&video).await.unwrap();

    assert_eq!(draft.title, "Tortilla de patatas");
    assert_eq!(draft.cooking_time, "40 min");
    assert_eq!(draft.ingredients.len(), 2);
    assert_eq!(draft.ingredients[1].quantity, "");
    assert_eq!(draft.steps.len(), 3);
    assert_eq!(draft.tags, vec!["española".to_string()]);
    assert_eq!(draft.video_file_id, FILE_NAME);
}

#[tokio::test]
async fn test_analyze_accepts_fenced_json() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_state(&server, "ACTIVE").await;
    mount_delete(&server).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate("```json\n{\"title\":\"Gazpacho\",\"steps\":[]}\n```")),
        )
        .mount(&server)
        .await;

    let (_dir, video) = video_file();
    let draft = test_client(&server).analyze(&video).await.unwrap();
    assert_eq!(draft.title, "Gazpacho");
}

#[tokio::test]
async fn test_polls_until_active() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_delete(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{}", FILE_NAME)))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("PROCESSING")))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_state(&server, "ACTIVE").await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(r#"{"title":"Soup"}"#)))
        .mount(&server)
        .await;

    let (_dir, video) = video_file();
    let draft = test_client(&server).analyze(&video).await.unwrap();
    assert_eq!(draft.title, "Soup");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_not_a_recipe_sentinel() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_state(&server, "ACTIVE").await;
    mount_delete(&server).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(r#"{"error":"not_a_recipe"}"#)))
        .mount(&server)
        .await;

    let (_dir, video) = video_file();
    let err = test_client(&server).analyze(&video).await.unwrap_err();
    assert!(matches!(err, ExtractError::NotARecipe));
}

#[tokio::test]
async fn test_rate_limit_keeps_status_and_deletes_remote_file() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_state(&server, "ACTIVE").await;
    mount_delete(&server).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .mount(&server)
        .await;

    let (_dir, video) = video_file();
    let err = test_client(&server).analyze(&video).await.unwrap_err();
    assert_eq!(err.http_status(), Some(429));
}

#[tokio::test]
async fn test_failed_remote_processing() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_state(&server, "FAILED").await;
    mount_delete(&server).await;

    let (_dir, video) = video_file();
    let err = test_client(&server).analyze(&video).await.unwrap_err();
    assert!(matches!(err, ExtractError::ProcessingFailed(_)));
}

#[tokio::test]
async fn test_poll_timeout() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_state(&server, "PROCESSING").await;
    mount_delete(&server).await;

    let (_dir, video) = video_file();
    let err = test_client(&server).analyze(&video).await.unwrap_err();
    assert!(matches!(err, ExtractError::Timeout { .. }));
}

#[tokio::test]
async fn test_missing_api_key_fails_without_requests() {
    let server = MockServer::start().await;
    let config = GeminiConfig::default().with_base_url(server.uri());
    let client = GeminiClient::new(config).unwrap();

    let (_dir, video) = video_file();
    let err = client.analyze(&video).await.unwrap_err();

    assert!(matches!(err, ExtractError::Config(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
