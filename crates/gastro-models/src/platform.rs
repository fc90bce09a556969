//! Platform resolution for social-media video URLs.
//!
//! Maps a submitted URL to the `(platform, external id)` natural key used to
//! deduplicate recipes. Resolution is pure: no network or storage access.
//!
//! Supported shapes, tried in this order per platform:
//! - YouTube: `youtube.com/shorts/ID`, `youtube.com/watch?v=ID`, `youtu.be/ID`,
//!   `youtube.com/embed/ID`
//! - Instagram: `instagram.com/reel/ID`, `instagram.com/reels/ID`,
//!   `instagram.com/p/ID`, `instagram.com/tv/ID`
//! - TikTok: `tiktok.com/@user/video/ID`

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Source platform of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            _ => Err(PlatformError::Unsupported),
        }
    }
}

/// Errors that can occur while resolving a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The URL does not belong to a supported platform.
    #[error("platform not supported")]
    Unsupported,

    /// The platform was recognized but no known URL shape matched.
    #[error("could not extract {0} ID")]
    IdNotFound(Platform),

    /// A shape matched but the captured ID has an unexpected format.
    #[error("unrecognized {platform} ID format: {id}")]
    InvalidId { platform: Platform, id: String },
}

/// Result type for platform resolution.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// The natural key of a source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoSource {
    pub platform: Platform,
    pub external_id: String,
}

impl VideoSource {
    pub fn new(platform: Platform, external_id: impl Into<String>) -> Self {
        Self {
            platform,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.external_id)
    }
}

/// A single URL shape: returns the raw ID segment when the shape matches.
type Shape = fn(&Url) -> Option<String>;

const YOUTUBE_SHAPES: &[Shape] = &[youtube_shorts, youtube_watch, youtube_short_link, youtube_embed];
const INSTAGRAM_SHAPES: &[Shape] = &[instagram_post];
const TIKTOK_SHAPES: &[Shape] = &[tiktok_video];

/// Resolve a video URL into its `(platform, external id)` pair.
///
/// The host selects the platform; after that only that platform's shapes are
/// tried, so a URL never produces an error or an ID from another platform.
pub fn resolve_platform(url: &str) -> PlatformResult<VideoSource> {
    let parsed = parse_url(url).ok_or(PlatformError::Unsupported)?;
    let platform = parsed
        .host_str()
        .and_then(platform_for_host)
        .ok_or(PlatformError::Unsupported)?;

    let shapes = match platform {
        Platform::Youtube => YOUTUBE_SHAPES,
        Platform::Instagram => INSTAGRAM_SHAPES,
        Platform::Tiktok => TIKTOK_SHAPES,
    };

    let id = shapes
        .iter()
        .find_map(|shape| shape(&parsed))
        .ok_or(PlatformError::IdNotFound(platform))?;

    validate_id(platform, id).map(|id| VideoSource::new(platform, id))
}

/// Parse a URL, accepting scheme-less input such as `youtu.be/abc`.
fn parse_url(url: &str) -> Option<Url> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", url)).ok()?
        }
        Err(_) => return None,
    };

    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

fn platform_for_host(host: &str) -> Option<Platform> {
    let host = host.to_ascii_lowercase();
    let on = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

    if on("youtube.com") || on("youtu.be") {
        Some(Platform::Youtube)
    } else if on("instagram.com") {
        Some(Platform::Instagram)
    } else if on("tiktok.com") {
        Some(Platform::Tiktok)
    } else {
        None
    }
}

fn capture_path(re: &Regex, url: &Url) -> Option<String> {
    re.captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

fn youtube_shorts(url: &Url) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^/shorts/([^/]+)").expect("valid shorts regex"));
    capture_path(re, url)
}

fn youtube_watch(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

fn youtube_short_link(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    if host != "youtu.be" && !host.ends_with(".youtu.be") {
        return None;
    }
    url.path_segments()?
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn youtube_embed(url: &Url) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^/(?:embed|live)/([^/]+)").expect("valid embed regex"));
    capture_path(re, url)
}

fn instagram_post(url: &Url) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^/(?:[^/]+/)?(?:reel|reels|p|tv)/([^/]+)").expect("valid instagram regex")
    });
    capture_path(re, url)
}

fn tiktok_video(url: &Url) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^/@[^/]+/video/([^/]+)").expect("valid tiktok regex"));
    capture_path(re, url)
}

/// Reject IDs with characters outside the platform's alphabet instead of
/// truncating them to a plausible-looking prefix.
fn validate_id(platform: Platform, id: String) -> PlatformResult<String> {
    let valid = match platform {
        Platform::Youtube | Platform::Instagram => id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        Platform::Tiktok => id.chars().all(|c| c.is_ascii_digit()),
    };

    if valid {
        Ok(id)
    } else {
        Err(PlatformError::InvalidId { platform, id })
    }
}
