//! Failure classification for collaborator errors.
//!
//! Both the synchronous API path and the retry worker decide what to do with a
//! failure through this module. Rules, in order:
//! - HTTP 429, a rate-limit marker (`HTTP Error 429`, `429 Too Many Requests`,
//!   `RESOURCE_EXHAUSTED`) or the word `quota` are transient (`quota` becomes
//!   `QuotaExceeded`, the rest `RateLimited`)
//! - the `not_a_recipe` sentinel is terminal and triggers media cleanup
//! - anything else is terminal
//!
//! Markers are matched on word boundaries so that video IDs, file names or
//! model output that merely contain the digits `429` stay terminal.

use std::sync::OnceLock;

use gastro_gemini::{ExtractError, NOT_A_RECIPE_SENTINEL};
use gastro_media::MediaError;
use regex::Regex;

use crate::error::PipelineError;

/// Verdict for a single failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotARecipe,
    RateLimited,
    QuotaExceeded,
    Other,
}

impl FailureClass {
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureClass::RateLimited | FailureClass::QuotaExceeded)
    }
}

fn quota_marker() -> &'static Regex {
    static QUOTA: OnceLock<Regex> = OnceLock::new();
    QUOTA.get_or_init(|| Regex::new(r"(?i)\bquota\b").expect("valid quota regex"))
}

fn rate_limit_marker() -> &'static Regex {
    static RATE_LIMIT: OnceLock<Regex> = OnceLock::new();
    RATE_LIMIT.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:HTTP Error 429|429 Too Many Requests|Too Many Requests|RESOURCE_EXHAUSTED|(?:status|code|error)[ :=]+429)\b",
        )
        .expect("valid rate limit regex")
    })
}

/// Classify a failure from its HTTP status (when known) and message text.
pub fn classify_message(status: Option<u16>, text: &str) -> FailureClass {
    if quota_marker().is_match(text) {
        return FailureClass::QuotaExceeded;
    }
    if status == Some(429) || rate_limit_marker().is_match(text) {
        return FailureClass::RateLimited;
    }
    if text.trim().eq_ignore_ascii_case(NOT_A_RECIPE_SENTINEL) {
        return FailureClass::NotARecipe;
    }
    FailureClass::Other
}

/// Map a Recipe Extractor failure onto the pipeline taxonomy.
///
/// Only errors carrying a response from the API are classified from their
/// status and message. Model output, remote file names and local failures
/// are never scanned.
pub fn classify_extract_error(error: ExtractError) -> PipelineError {
    let class = match &error {
        ExtractError::NotARecipe => return PipelineError::NotARecipe,
        ExtractError::Api { status, message } => classify_message(Some(*status), message),
        ExtractError::Network(e) => {
            classify_message(e.status().map(|s| s.as_u16()), &e.to_string())
        }
        _ => FailureClass::Other,
    };

    let message = error.to_string();
    match class {
        FailureClass::NotARecipe => PipelineError::NotARecipe,
        FailureClass::RateLimited => PipelineError::RateLimited(message),
        FailureClass::QuotaExceeded => PipelineError::QuotaExceeded(message),
        FailureClass::Other => PipelineError::ExtractionOther(message),
    }
}

/// Map a Video Acquirer failure onto the pipeline taxonomy.
///
/// Captured stderr takes part in classification so that platform rate limits
/// reported by yt-dlp are retried later.
pub fn classify_media_error(error: MediaError) -> PipelineError {
    let message = error.to_string();
    match classify_message(None, &error.details()) {
        FailureClass::RateLimited => PipelineError::RateLimited(message),
        FailureClass::QuotaExceeded => PipelineError::QuotaExceeded(message),
        FailureClass::NotARecipe | FailureClass::Other => {
            PipelineError::AcquisitionFailed(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_message_rules() {
        assert_eq!(classify_message(Some(429), "slow down"), FailureClass::RateLimited);
        assert_eq!(
            classify_message(None, "HTTP Error 429: Too Many Requests"),
            FailureClass::RateLimited
        );
        assert_eq!(
            classify_message(Some(403), "You exceeded your current QUOTA"),
            FailureClass::QuotaExceeded
        );
        assert_eq!(classify_message(None, "not_a_recipe"), FailureClass::NotARecipe);
        assert_eq!(classify_message(Some(500), "internal"), FailureClass::Other);
    }

    #[test]
    fn test_digits_inside_words_are_not_rate_limits() {
        assert_eq!(
            classify_message(None, "ERROR: [TikTok] 7234291234567890123: This video is private"),
            FailureClass::Other
        );
        assert_eq!(classify_message(None, "files/abc429xyz not found"), FailureClass::Other);
        assert_eq!(classify_message(None, "ERROR: Video unavailable"), FailureClass::Other);
        assert_eq!(classify_message(None, "quotation marks"), FailureClass::Other);
    }

    #[test]
    fn test_classify_extract_errors() {
        assert!(matches!(
            classify_extract_error(ExtractError::NotARecipe),
            PipelineError::NotARecipe
        ));
        assert!(matches!(
            classify_extract_error(ExtractError::from_http_status(429, "RESOURCE_EXHAUSTED")),
            PipelineError::RateLimited(_)
        ));
        assert!(matches!(
            classify_extract_error(ExtractError::from_http_status(400, "quota exceeded")),
            PipelineError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_extract_error(ExtractError::config("GEMINI_API_KEY not set")),
            PipelineError::ExtractionOther(_)
        ));
    }

    #[test]
    fn test_model_output_is_never_scanned() {
        let unparseable = ExtractError::invalid_response(
            r#"{"title":"Bizcocho","ingredients":[{"name":"harina","quantity":"429 g"}],"#,
        );
        assert!(matches!(
            classify_extract_error(unparseable),
            PipelineError::ExtractionOther(_)
        ));

        let timeout = ExtractError::Timeout {
            name: "files/quota-429".into(),
            waited_secs: 300,
        };
        assert!(!classify_extract_error(timeout).is_transient());

        let failed = ExtractError::ProcessingFailed("files/429".into());
        assert!(!classify_extract_error(failed).is_transient());
    }

    #[test]
    fn test_classify_media_errors() {
        let rate_limited = MediaError::DownloadFailed {
            message: "yt-dlp failed: ERROR: unable to download".into(),
            stderr: Some("HTTP Error 429: Too Many Requests".into()),
            exit_code: Some(1),
        };
        let err = classify_media_error(rate_limited);
        assert!(err.is_transient());

        let private = MediaError::DownloadFailed {
            message: "yt-dlp failed: ERROR: [TikTok] 7234291234567890123: This video is private"
                .into(),
            stderr: Some("ERROR: [TikTok] 7234291234567890123: This video is private".into()),
            exit_code: Some(1),
        };
        let err = classify_media_error(private);
        assert!(matches!(err, PipelineError::AcquisitionFailed(_)));
        assert!(!err.is_transient());

        let missing = classify_media_error(MediaError::YtDlpNotFound("yt-dlp".into()));
        assert!(matches!(missing, PipelineError::AcquisitionFailed(_)));
    }

    #[test]
    fn test_transient_classes() {
        assert!(FailureClass::RateLimited.is_transient());
        assert!(FailureClass::QuotaExceeded.is_transient());
        assert!(!FailureClass::NotARecipe.is_transient());
        assert!(!FailureClass::Other.is_transient());
    }
}
