//! Media acquisition for the recipe pipeline.
//!
//! This crate provides:
//! - The `VideoAcquirer` trait and its yt-dlp implementation
//! - Thumbnail path conventions and media cleanup helpers

pub mod download;
pub mod error;
pub mod fs_utils;

pub use download::{AcquiredVideo, VideoAcquirer, YtDlpAcquirer};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{remove_if_exists, remove_video_files, thumbnail_path_for};
