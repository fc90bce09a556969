//! Video download using yt-dlp.
//!
//! This module provides the [`VideoAcquirer`] seam used by the pipeline and
//! its yt-dlp implementation. yt-dlp writes the merged MP4 to the requested
//! path and a JPEG thumbnail next to it with the same base name.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{thumbnail_path_for, THUMBNAIL_EXTENSION};

/// Default yt-dlp format selector: best streams merged into one file.
const DEFAULT_FORMAT: &str = "bestvideo+bestaudio/best";

/// Container yt-dlp merges the streams into.
const MERGE_FORMAT: &str = "mp4";

/// Files produced by a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredVideo {
    pub video_path: PathBuf,
    pub thumbnail_path: PathBuf,
}

/// Downloads a video URL to a local file.
#[async_trait]
pub trait VideoAcquirer: Send + Sync {
    /// Download `url` to `destination`, producing the video and its thumbnail.
    async fn acquire(&self, url: &str, destination: &Path) -> MediaResult<AcquiredVideo>;
}

/// [`VideoAcquirer`] backed by the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    binary: String,
    format: String,
}

impl Default for YtDlpAcquirer {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

impl YtDlpAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from environment variables (`YTDLP_PATH`).
    pub fn from_env() -> Self {
        Self {
            binary: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            ..Self::default()
        }
    }

    /// Use a specific yt-dlp executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Check that the configured binary can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    fn build_args(&self, url: &str, destination: &Path) -> Vec<String> {
        vec![
            "-o".to_string(),
            destination.to_string_lossy().to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--merge-output-format".to_string(),
            MERGE_FORMAT.to_string(),
            "--write-thumbnail".to_string(),
            "--convert-thumbnails".to_string(),
            THUMBNAIL_EXTENSION.to_string(),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl VideoAcquirer for YtDlpAcquirer {
    async fn acquire(&self, url: &str, destination: &Path) -> MediaResult<AcquiredVideo> {
        which::which(&self.binary)
            .map_err(|e| MediaError::YtDlpNotFound(format!("{}: {}", self.binary, e)))?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!(
            url = %url,
            output = %destination.display(),
            "Downloading video with yt-dlp"
        );

        let output = Command::new(&self.binary)
            .args(self.build_args(url, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            debug!("yt-dlp stderr: {}", stderr);

            let error_msg = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("Unknown error")
                .to_string();

            if stderr.contains("429") || stderr.contains("Too Many Requests") {
                warn!(url = %url, "Platform rate limit detected during download");
            }

            return Err(MediaError::DownloadFailed {
                message: format!("yt-dlp failed: {}", error_msg),
                stderr: Some(stderr),
                exit_code: output.status.code(),
            });
        }

        if !destination.exists() {
            return Err(MediaError::FileNotFound(destination.to_path_buf()));
        }

        let thumbnail_path = thumbnail_path_for(destination);
        if !thumbnail_path.exists() {
            warn!(
                thumbnail = %thumbnail_path.display(),
                "yt-dlp did not produce a thumbnail"
            );
        }

        let file_size = destination.metadata()?.len();
        info!(
            output = %destination.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded video successfully"
        );

        Ok(AcquiredVideo {
            video_path: destination.to_path_buf(),
            thumbnail_path,
        })
    }
}
