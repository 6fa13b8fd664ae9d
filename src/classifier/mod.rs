//! Maps raw responses to the error taxonomy.
//!
//! YouTube answers throttling, blocking and plain failures with overlapping status codes
//! and interstitial pages. Status codes are judged for every response by [`classify`];
//! a successful response is only searched for interstitial text by [`check_interstitial`]
//! once it failed to yield the payload the caller expected, since descriptions and cues
//! may quote the same phrases.

use crate::transport::HttpResponse;
use crate::{Result, TranscriptError};

/// Markers of the captcha interstitial served to throttled clients
const RATE_LIMIT_MARKERS: &[&str] = &[
    "class=\"g-recaptcha\"",
    "Our systems have detected unusual traffic",
];

/// Markers of pages served to blocklisted addresses
const IP_BLOCK_MARKERS: &[&str] = &[
    "Sign in to confirm you’re not a bot",
    "Sign in to confirm you're not a bot",
    "action=\"/sorry/index\"",
    "https://www.google.com/sorry/index",
];

/// Check the status of a response.
///
/// A 429 is throttling. Any other non-2xx status is a failure, refined to throttling or
/// blocking when the error page says so.
pub fn classify(video_id: &str, response: &HttpResponse) -> Result<()> {
    if response.status == 429 {
        tracing::warn!("Rate limited while fetching {} (HTTP 429)", video_id);
        return Err(TranscriptError::TooManyRequests {
            video_id: video_id.to_string(),
        });
    }

    if !response.is_success() {
        check_interstitial(video_id, &response.body)?;

        let reason = reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown status");
        tracing::debug!("HTTP {} for {}", response.status, video_id);
        return Err(TranscriptError::YouTubeRequestFailed {
            video_id: video_id.to_string(),
            status: response.status,
            reason: reason.to_string(),
        });
    }

    Ok(())
}

/// Recognize a captcha or bot-check page in a body that lacked the expected payload
pub fn check_interstitial(video_id: &str, body: &str) -> Result<()> {
    if RATE_LIMIT_MARKERS.iter().any(|marker| body.contains(marker)) {
        tracing::warn!("Captcha page served for {}", video_id);
        return Err(TranscriptError::TooManyRequests {
            video_id: video_id.to_string(),
        });
    }

    if IP_BLOCK_MARKERS.iter().any(|marker| body.contains(marker)) {
        tracing::warn!("Request for {} blocked by IP", video_id);
        return Err(TranscriptError::IpBlocked {
            video_id: video_id.to_string(),
        });
    }

    Ok(())
}
