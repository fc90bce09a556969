//! Filesystem helpers for downloaded media.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;

/// Extension yt-dlp uses for converted thumbnails.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Thumbnail written next to a video: same base name, `.jpg` extension.
pub fn thumbnail_path_for(video_path: &Path) -> PathBuf {
    video_path.with_extension(THUMBNAIL_EXTENSION)
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` if a file was actually deleted.
pub async fn remove_if_exists(path: &Path) -> MediaResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed media file");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove a downloaded video together with its thumbnail.
pub async fn remove_video_files(video_path: &Path) -> MediaResult<()> {
    remove_if_exists(video_path).await?;
    remove_if_exists(&thumbnail_path_for(video_path)).await?;
    Ok(())
}
