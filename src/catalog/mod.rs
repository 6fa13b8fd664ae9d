use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::{Result, TranscriptError};

/// A language a track can be machine-translated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLanguage {
    /// Display name, e.g. "German"
    pub language: String,

    /// Language code, e.g. "de"
    pub language_code: String,
}

/// Immutable descriptor of one caption track.
///
/// Holds no live resources; fetching its cues is a separate operation
/// (see [`crate::captions::fetch_cues`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub video_id: String,

    /// Display name, e.g. "English (auto-generated)"
    pub language: String,

    pub language_code: String,

    /// True for automatic speech recognition tracks
    pub is_generated: bool,

    /// Timedtext URL; may embed a signature and expiry
    pub base_url: String,

    pub is_translatable: bool,

    /// Empty unless the track is translatable
    pub translation_languages: Vec<TranslationLanguage>,
}

impl CaptionTrack {
    /// Describe the same track machine-translated into `language_code`.
    ///
    /// No request is made; the translation happens server side when the returned track
    /// is fetched.
    pub fn translate(&self, language_code: &str) -> Result<CaptionTrack> {
        if !self.is_translatable {
            return Err(TranscriptError::NotTranslatable {
                video_id: self.video_id.clone(),
                language_code: self.language_code.clone(),
            });
        }

        let target = self
            .translation_languages
            .iter()
            .find(|lang| lang.language_code.eq_ignore_ascii_case(language_code))
            .ok_or_else(|| TranscriptError::TranslationLanguageNotAvailable {
                video_id: self.video_id.clone(),
                requested: language_code.to_string(),
                available: self
                    .translation_languages
                    .iter()
                    .map(|lang| lang.language_code.clone())
                    .collect(),
            })?;

        tracing::debug!(
            "Translating {} track of {} to {}",
            self.language_code,
            self.video_id,
            target.language_code
        );

        Ok(CaptionTrack {
            video_id: self.video_id.clone(),
            language: target.language.clone(),
            language_code: target.language_code.clone(),
            is_generated: true,
            base_url: with_translation_target(&self.base_url, &target.language_code),
            is_translatable: false,
            translation_languages: Vec::new(),
        })
    }

    fn matches(&self, language_code: &str) -> bool {
        self.language_code.eq_ignore_ascii_case(language_code)
    }
}

impl fmt::Display for CaptionTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (\"{}\")", self.language_code, self.language)?;
        if self.is_translatable {
            write!(f, "[TRANSLATABLE]")?;
        }
        Ok(())
    }
}

/// Set `tlang` on a timedtext URL, replacing any existing value
fn with_translation_target(base_url: &str, language_code: &str) -> String {
    match Url::parse(base_url) {
        Ok(mut url) => {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "tlang")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(pairs)
                .append_pair("tlang", language_code);
            url.to_string()
        }
        Err(_) => {
            let separator = if base_url.contains('?') { '&' } else { '?' };
            format!(
                "{}{}tlang={}",
                base_url,
                separator,
                urlencoding::encode(language_code)
            )
        }
    }
}

/// Which kinds of track a lookup may return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub manual_only: bool,
    pub generated_only: bool,
}

impl TrackFilter {
    pub fn manual_only() -> Self {
        Self {
            manual_only: true,
            generated_only: false,
        }
    }

    pub fn generated_only() -> Self {
        Self {
            manual_only: false,
            generated_only: true,
        }
    }
}

/// All caption tracks discovered for one video
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCatalog {
    video_id: String,
    manually_created: Vec<CaptionTrack>,
    generated: Vec<CaptionTrack>,
    translation_languages: Vec<TranslationLanguage>,
}

impl TrackCatalog {
    /// Build a catalog from tracks in platform order.
    ///
    /// Keeps at most one manual and one generated track per language code; later
    /// duplicates are dropped.
    pub fn new(
        video_id: impl Into<String>,
        tracks: impl IntoIterator<Item = CaptionTrack>,
        translation_languages: Vec<TranslationLanguage>,
    ) -> Self {
        let video_id = video_id.into();
        let mut manually_created: Vec<CaptionTrack> = Vec::new();
        let mut generated: Vec<CaptionTrack> = Vec::new();

        for track in tracks {
            let group = if track.is_generated {
                &mut generated
            } else {
                &mut manually_created
            };

            if group.iter().any(|existing| existing.matches(&track.language_code)) {
                tracing::warn!(
                    "Dropping duplicate {} track {} for video {}",
                    if track.is_generated { "generated" } else { "manual" },
                    track.language_code,
                    video_id
                );
                continue;
            }
            group.push(track);
        }

        Self {
            video_id,
            manually_created,
            generated,
            translation_languages,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Whether the video offers machine translation at all
    pub fn is_translatable(&self) -> bool {
        !self.translation_languages.is_empty()
    }

    pub fn translation_languages(&self) -> &[TranslationLanguage] {
        &self.translation_languages
    }

    /// All tracks, manual ones first
    pub fn iter(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.manually_created.iter().chain(self.generated.iter())
    }

    pub fn manually_created(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.manually_created.iter()
    }

    pub fn generated(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.generated.iter()
    }

    pub fn len(&self) -> usize {
        self.manually_created.len() + self.generated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct language codes in catalog order
    pub fn available_languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for track in self.iter() {
            if !codes.iter().any(|code| track.matches(code)) {
                codes.push(track.language_code.clone());
            }
        }
        codes
    }

    /// Find the best track for a language priority list.
    ///
    /// Languages are tried in the given order; within one language a manual track beats
    /// a generated one.
    pub fn find<S: AsRef<str>>(&self, language_codes: &[S], filter: TrackFilter) -> Result<&CaptionTrack> {
        for code in language_codes {
            let code: &str = code.as_ref();

            if !filter.generated_only {
                if let Some(track) = self.manually_created.iter().find(|t| t.matches(code)) {
                    tracing::debug!("Selected manual {} track for {}", track.language_code, self.video_id);
                    return Ok(track);
                }
            }

            if !filter.manual_only {
                if let Some(track) = self.generated.iter().find(|t| t.matches(code)) {
                    tracing::debug!("Selected generated {} track for {}", track.language_code, self.video_id);
                    return Ok(track);
                }
            }
        }

        Err(TranscriptError::NoTranscriptFound {
            video_id: self.video_id.clone(),
            requested: language_codes
                .iter()
                .map(|code| AsRef::<str>::as_ref(code).to_string())
                .collect(),
            available: self.available_languages(),
        })
    }

    /// Find a track of either kind, preferring manual ones
    pub fn find_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&CaptionTrack> {
        self.find(language_codes, TrackFilter::default())
    }

    pub fn find_manually_created<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&CaptionTrack> {
        self.find(language_codes, TrackFilter::manual_only())
    }

    pub fn find_generated<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&CaptionTrack> {
        self.find(language_codes, TrackFilter::generated_only())
    }
}

impl<'a> IntoIterator for &'a TrackCatalog {
    type Item = &'a CaptionTrack;
    type IntoIter = std::iter::Chain<std::slice::Iter<'a, CaptionTrack>, std::slice::Iter<'a, CaptionTrack>>;

    fn into_iter(self) -> Self::IntoIter {
        self.manually_created.iter().chain(self.generated.iter())
    }
}

impl fmt::Display for TrackCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn section(f: &mut fmt::Formatter<'_>, title: &str, lines: Vec<String>) -> fmt::Result {
            writeln!(f, "({})", title)?;
            if lines.is_empty() {
                writeln!(f, "None")
            } else {
                for line in lines {
                    writeln!(f, " - {}", line)?;
                }
                Ok(())
            }
        }

        writeln!(f, "For this video ({}) transcripts are available in the following languages:", self.video_id)?;
        writeln!(f)?;
        section(f, "MANUALLY CREATED", self.manually_created.iter().map(|t| t.to_string()).collect())?;
        writeln!(f)?;
        section(f, "GENERATED", self.generated.iter().map(|t| t.to_string()).collect())?;
        writeln!(f)?;
        section(
            f,
            "TRANSLATION LANGUAGES",
            self.translation_languages
                .iter()
                .map(|l| format!("{} (\"{}\")", l.language_code, l.language))
                .collect(),
        )
    }
}
