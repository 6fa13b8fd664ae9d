use serde::{Deserialize, Serialize};

use crate::captions::{self, Cue, CueParser, CueSequence};
use crate::catalog::{CaptionTrack, TrackCatalog, TrackFilter};
use crate::classifier;
use crate::config::{Config, TranscriptConfig};
use crate::extractor;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Result, TranscriptError};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Cues of one track together with what they are
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedTranscript {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub cues: CueSequence,
}

impl FetchedTranscript {
    pub fn from_track(track: &CaptionTrack, cues: CueSequence) -> Self {
        Self {
            video_id: track.video_id.clone(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            cues,
        }
    }

    /// All cue texts joined by newlines
    pub fn text(&self) -> String {
        self.cues
            .iter()
            .map(|cue| cue.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a FetchedTranscript {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

/// Entry point tying transport, page extraction, track selection and cue parsing together
pub struct TranscriptApi<T: Transport> {
    transport: T,
    formatting_tags: Vec<String>,
}

impl TranscriptApi<ReqwestTransport> {
    /// Create an API client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.http)?;
        Ok(Self::new(transport).with_formatting_tags(config.transcript.formatting_tags.clone()))
    }
}

impl<T: Transport> TranscriptApi<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            formatting_tags: TranscriptConfig::default().formatting_tags,
        }
    }

    /// Inline tags kept when formatting is preserved
    pub fn with_formatting_tags(mut self, tags: Vec<String>) -> Self {
        self.formatting_tags = tags;
        self
    }

    fn parser(&self, preserve_formatting: bool) -> CueParser {
        CueParser::with_formatting_tags(preserve_formatting, &self.formatting_tags)
    }

    /// List the caption tracks of a video.
    ///
    /// A consent wall is answered once with the consent cookie taken from the wall itself;
    /// if the page is still gated afterwards the caller gets `ConsentRequired`.
    pub async fn list(&self, video_id: &str) -> Result<TrackCatalog> {
        let html = self.fetch_watch_page(video_id).await?;

        match extract_catalog(video_id, &html) {
            Err(TranscriptError::ConsentRequired { .. }) => {
                let value = extractor::consent_value(&html).ok_or_else(|| {
                    TranscriptError::ConsentRequired {
                        video_id: video_id.to_string(),
                    }
                })?;
                tracing::info!("Accepting consent wall for {}", video_id);
                self.transport.set_consent_cookie(&value)?;

                let html = self.fetch_watch_page(video_id).await?;
                extract_catalog(video_id, &html)
            }
            other => other,
        }
    }

    async fn fetch_watch_page(&self, video_id: &str) -> Result<String> {
        let url = format!("{}{}", WATCH_URL, urlencoding::encode(video_id));
        tracing::debug!("Fetching watch page {}", url);

        let response = self.transport.get(&url).await?;
        classifier::classify(video_id, &response)?;
        Ok(response.body)
    }

    /// Fetch the cues of a track
    pub async fn fetch_track(&self, track: &CaptionTrack, preserve_formatting: bool) -> Result<FetchedTranscript> {
        let cues = captions::fetch_cues(&self.transport, track, &self.parser(preserve_formatting)).await?;
        Ok(FetchedTranscript::from_track(track, cues))
    }

    /// Fetch the best matching transcript for a language priority list
    pub async fn fetch<S: AsRef<str>>(
        &self,
        video_id: &str,
        languages: &[S],
        filter: TrackFilter,
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript> {
        let catalog = self.list(video_id).await?;
        let track = catalog.find(languages, filter)?;
        self.fetch_track(track, preserve_formatting).await
    }

    /// Fetch the best matching transcript machine-translated into `target_language`
    pub async fn translate<S: AsRef<str>>(
        &self,
        video_id: &str,
        languages: &[S],
        filter: TrackFilter,
        target_language: &str,
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript> {
        let catalog = self.list(video_id).await?;
        let track = catalog.find(languages, filter)?.translate(target_language)?;
        self.fetch_track(&track, preserve_formatting).await
    }
}

/// Extract the catalog, explaining a page without player data or captions by any
/// interstitial it turns out to be
fn extract_catalog(video_id: &str, html: &str) -> Result<TrackCatalog> {
    extractor::extract(video_id, html).map_err(|err| match err {
        TranscriptError::PageStructureUnrecognized { .. } | TranscriptError::TranscriptsDisabled { .. } => {
            classifier::check_interstitial(video_id, html).err().unwrap_or(err)
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, MockTransport};
    use mockall::Sequence;

    const WATCH_PAGE: &str = r#"<html><script>var ytInitialPlayerResponse = {"playabilityStatus": {"status": "OK"}, "captions": {"playerCaptionsTracklistRenderer": {
        "captionTracks": [
            {"baseUrl": "https://www.youtube.com/api/timedtext?v=GJLlxj_dtq8&lang=de", "name": {"simpleText": "Deutsch"}, "languageCode": "de", "isTranslatable": true},
            {"baseUrl": "https://www.youtube.com/api/timedtext?v=GJLlxj_dtq8&lang=en&kind=asr", "name": {"simpleText": "English (auto-generated)"}, "languageCode": "en", "kind": "asr", "isTranslatable": true}
        ],
        "translationLanguages": [{"languageCode": "fr", "languageName": {"simpleText": "French"}}]
    }}};</script></html>"#;

    const CONSENT_PAGE: &str = r#"<form action="https://consent.youtube.com/s" method="POST"><input type="hidden" name="v" value="cb.20210328-17-p0.de+FX+119"></form>"#;

    const CAPTIONS: &str = r#"<transcript><text start="0.0" dur="1.0">Hallo &amp;amp; willkommen</text><text start="1.0" dur="2.5">&lt;i&gt;zweite&lt;/i&gt; Zeile</text></transcript>"#;

    fn watch_page_transport() -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url| url.starts_with(WATCH_URL))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, WATCH_PAGE)));
        transport
    }

    #[tokio::test]
    async fn test_fetch_prefers_language_priority() {
        let mut transport = watch_page_transport();
        transport
            .expect_get()
            .withf(|url| url.ends_with("lang=de"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, CAPTIONS)));

        let api = TranscriptApi::new(transport);
        let transcript = api
            .fetch("GJLlxj_dtq8", &["de", "en"], TrackFilter::default(), false)
            .await
            .unwrap();

        assert_eq!(transcript.language_code, "de");
        assert!(!transcript.is_generated);
        assert_eq!(transcript.text(), "Hallo & willkommen\nzweite Zeile");
        assert_eq!((&transcript).into_iter().count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_preserving_formatting() {
        let mut transport = watch_page_transport();
        transport
            .expect_get()
            .withf(|url| url.ends_with("lang=de"))
            .returning(|_| Ok(HttpResponse::new(200, CAPTIONS)));

        let api = TranscriptApi::new(transport);
        let transcript = api
            .fetch("GJLlxj_dtq8", &["de"], TrackFilter::default(), true)
            .await
            .unwrap();

        assert_eq!(transcript.cues[1].text, "<i>zweite</i> Zeile");
    }

    #[tokio::test]
    async fn test_translate_requests_target_language() {
        let mut transport = watch_page_transport();
        transport
            .expect_get()
            .withf(|url| url.contains("kind=asr") && url.ends_with("tlang=fr"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, CAPTIONS)));

        let api = TranscriptApi::new(transport);
        let transcript = api
            .translate("GJLlxj_dtq8", &["en"], TrackFilter::default(), "fr", false)
            .await
            .unwrap();

        assert_eq!(transcript.language, "French");
        assert_eq!(transcript.language_code, "fr");
        assert!(transcript.is_generated);
    }

    #[tokio::test]
    async fn test_translate_to_unknown_language_makes_no_caption_request() {
        let api = TranscriptApi::new(watch_page_transport());
        let err = api
            .translate("GJLlxj_dtq8", &["de"], TrackFilter::default(), "ko", false)
            .await
            .unwrap_err();

        assert!(matches!(err, TranscriptError::TranslationLanguageNotAvailable { .. }));
    }

    #[tokio::test]
    async fn test_no_match_lists_available() {
        let api = TranscriptApi::new(watch_page_transport());
        let err = api
            .fetch("GJLlxj_dtq8", &["fr"], TrackFilter::default(), false)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TranscriptError::NoTranscriptFound {
                video_id: "GJLlxj_dtq8".to_string(),
                requested: vec!["fr".to_string()],
                available: vec!["de".to_string(), "en".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_consent_wall_is_accepted_once() {
        let mut seq = Sequence::new();
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(200, CONSENT_PAGE)));
        transport
            .expect_set_consent_cookie()
            .withf(|value| value == "cb.20210328-17-p0.de+FX+119")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(200, WATCH_PAGE)));

        let api = TranscriptApi::new(transport);
        let catalog = api.list("GJLlxj_dtq8").await.unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_consent_wall_fails() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(200, CONSENT_PAGE)));
        transport.expect_set_consent_cookie().times(1).returning(|_| Ok(()));

        let api = TranscriptApi::new(transport);
        assert!(matches!(
            api.list("GJLlxj_dtq8").await,
            Err(TranscriptError::ConsentRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_watch_page_rate_limit() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_| Ok(HttpResponse::new(429, "Too Many Requests")));

        let api = TranscriptApi::new(transport);
        let err = api.list("GJLlxj_dtq8").await.unwrap_err();
        assert!(err.should_back_off());
    }

    #[tokio::test]
    async fn test_description_quoting_bot_check_still_lists_tracks() {
        let page = WATCH_PAGE.replace(
            r#""playabilityStatus": {"status": "OK"}"#,
            r#""playabilityStatus": {"status": "OK"}, "videoDetails": {"shortDescription": "How to fix 'Sign in to confirm you're not a bot' errors"}"#,
        );
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(move |_| Ok(HttpResponse::new(200, page.clone())));

        let api = TranscriptApi::new(transport);
        let catalog = api.list("GJLlxj_dtq8").await.unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_bot_check_page_without_player_data_is_ip_blocked() {
        let mut transport = MockTransport::new();
        transport.expect_get().returning(|_| {
            Ok(HttpResponse::new(
                200,
                "<html><h1>Sign in to confirm you're not a bot</h1></html>",
            ))
        });

        let api = TranscriptApi::new(transport);
        let err = api.list("GJLlxj_dtq8").await.unwrap_err();
        assert_eq!(
            err,
            TranscriptError::IpBlocked {
                video_id: "GJLlxj_dtq8".to_string()
            }
        );
        assert!(err.should_back_off());
    }

    #[tokio::test]
    async fn test_page_without_captions_is_disabled_not_missing() {
        let mut transport = MockTransport::new();
        transport.expect_get().returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"<script>var ytInitialPlayerResponse = {"playabilityStatus": {"status": "OK"}};</script>"#,
            ))
        });

        let api = TranscriptApi::new(transport);
        assert!(matches!(
            api.fetch("GJLlxj_dtq8", &["en"], TrackFilter::default(), false).await,
            Err(TranscriptError::TranscriptsDisabled { .. })
        ));
    }
}
