use serde::{Deserialize, Serialize};

use crate::catalog::CaptionTrack;
use crate::classifier;
use crate::transport::Transport;
use crate::{Result, TranscriptError};

pub mod parser;

pub use parser::{CueParser, DEFAULT_FORMATTING_TAGS};

/// One timed text segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Decoded text, possibly empty
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds; zero-length cues are kept
    pub duration: f64,
}

impl Cue {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Cues in the order the caption document delivered them
pub type CueSequence = Vec<Cue>;

/// Download and parse the cues of one track.
///
/// Makes exactly one request. Nothing is cached; calling it again fetches again.
pub async fn fetch_cues<T>(transport: &T, track: &CaptionTrack, parser: &CueParser) -> Result<CueSequence>
where
    T: Transport + ?Sized,
{
    if track.base_url.contains("&exp=xpe") {
        return Err(TranscriptError::PoTokenRequired {
            video_id: track.video_id.clone(),
        });
    }

    tracing::debug!(
        "Fetching {} captions for {}",
        track.language_code,
        track.video_id
    );
    let response = transport.get(&track.base_url).await?;
    classifier::classify(&track.video_id, &response)?;

    let cues = parser
        .parse(&track.video_id, &response.body)
        .map_err(|err| match err {
            TranscriptError::NoTranscriptFound {
                video_id, available, ..
            } => {
                let missing = TranscriptError::NoTranscriptFound {
                    video_id,
                    requested: vec![track.language_code.clone()],
                    available,
                };
                classifier::check_interstitial(&track.video_id, &response.body)
                    .err()
                    .unwrap_or(missing)
            }
            other => other,
        })?;

    tracing::info!(
        "Parsed {} cues for {} ({})",
        cues.len(),
        track.video_id,
        track.language_code
    );
    Ok(cues)
}
