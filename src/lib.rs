//! yt-transcript - fetch YouTube captions without the official API
//!
//! This library scrapes the caption track list out of a video's watch page, picks a track
//! by language priority, optionally asks YouTube to machine-translate it, and parses the
//! timed-text document into an ordered list of cues.

pub mod api;
pub mod captions;
pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod extractor;
pub mod output;
pub mod transport;
pub mod utils;

pub use api::{FetchedTranscript, TranscriptApi};
pub use captions::{Cue, CueParser, CueSequence};
pub use catalog::{CaptionTrack, TrackCatalog, TrackFilter, TranslationLanguage};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use transport::{HttpResponse, ReqwestTransport, Transport};

/// Result type used by the caption pipeline
pub type Result<T, E = TranscriptError> = std::result::Result<T, E>;

/// Everything that can go wrong between a video id and a list of cues.
///
/// Each variant names one operationally distinct condition so callers can decide whether
/// to back off, give up on the video, or report a broken scraper.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    #[error("Subtitles are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("Video {video_id} is unavailable (removed, private or nonexistent)")]
    VideoUnavailable { video_id: String },

    #[error("Video {video_id} is age restricted and requires signing in")]
    AgeRestricted { video_id: String },

    #[error("Video {video_id} is unplayable: {reason}")]
    VideoUnplayable {
        video_id: String,
        reason: String,
        sub_reasons: Vec<String>,
    },

    #[error("Video {video_id} is behind a consent wall; retry with a consent cookie")]
    ConsentRequired { video_id: String },

    #[error("Could not find caption data in the watch page of {video_id} ({detail}); the page format may have changed")]
    PageStructureUnrecognized { video_id: String, detail: String },

    #[error(
        "No transcript found for video {video_id} in any of {requested:?} (available: {available:?})"
    )]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Transcript {language_code} of video {video_id} is not translatable")]
    NotTranslatable {
        video_id: String,
        language_code: String,
    },

    #[error("Video {video_id} cannot be translated to {requested} (available: {available:?})")]
    TranslationLanguageNotAvailable {
        video_id: String,
        requested: String,
        available: Vec<String>,
    },

    #[error("Video {video_id} requires a PO token to fetch captions")]
    PoTokenRequired { video_id: String },

    #[error("Caption document for video {video_id} is malformed: {detail}")]
    CaptionDocumentMalformed { video_id: String, detail: String },

    #[error("YouTube is rate limiting requests (video {video_id}); back off before retrying")]
    TooManyRequests { video_id: String },

    #[error("YouTube is blocking requests from this IP address (video {video_id})")]
    IpBlocked { video_id: String },

    #[error("Request for video {video_id} failed: HTTP {status} {reason}")]
    YouTubeRequestFailed {
        video_id: String,
        status: u16,
        reason: String,
    },

    #[error("Invalid video id or URL: {0}")]
    InvalidVideoId(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl TranscriptError {
    /// True when the caller is being throttled and should slow down rather than move on.
    pub fn should_back_off(&self) -> bool {
        matches!(
            self,
            TranscriptError::TooManyRequests { .. } | TranscriptError::IpBlocked { .. }
        )
    }

    /// The video this error is about, if it concerns one.
    pub fn video_id(&self) -> Option<&str> {
        match self {
            TranscriptError::TranscriptsDisabled { video_id }
            | TranscriptError::VideoUnavailable { video_id }
            | TranscriptError::AgeRestricted { video_id }
            | TranscriptError::VideoUnplayable { video_id, .. }
            | TranscriptError::ConsentRequired { video_id }
            | TranscriptError::PageStructureUnrecognized { video_id, .. }
            | TranscriptError::NoTranscriptFound { video_id, .. }
            | TranscriptError::NotTranslatable { video_id, .. }
            | TranscriptError::TranslationLanguageNotAvailable { video_id, .. }
            | TranscriptError::PoTokenRequired { video_id }
            | TranscriptError::CaptionDocumentMalformed { video_id, .. }
            | TranscriptError::TooManyRequests { video_id }
            | TranscriptError::IpBlocked { video_id }
            | TranscriptError::YouTubeRequestFailed { video_id, .. } => Some(video_id),
            TranscriptError::InvalidVideoId(_) | TranscriptError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for TranscriptError {
    fn from(err: reqwest::Error) -> Self {
        TranscriptError::Transport(err.to_string())
    }
}
