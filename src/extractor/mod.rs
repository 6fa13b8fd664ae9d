//! Watch page scraping.
//!
//! All knowledge about where YouTube hides the caption list lives here. When the page
//! layout drifts the failure surfaces as `PageStructureUnrecognized` instead of leaking
//! half-parsed data into the rest of the pipeline.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

use crate::catalog::{CaptionTrack, TrackCatalog, TranslationLanguage};
use crate::{Result, TranscriptError};

pub mod blob;

pub use blob::json_objects;

/// Marker preceding the player configuration object
pub const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
    error_screen: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawTrack>,
    #[serde(default)]
    translation_languages: Vec<RawTranslationLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    base_url: Option<String>,
    name: Option<LocalizedText>,
    language_code: Option<String>,
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTranslationLanguage {
    language_code: String,
    language_name: Option<LocalizedText>,
}

/// YouTube renders text either as `simpleText` or as a list of `runs`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizedText {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl LocalizedText {
    fn text(&self) -> Option<String> {
        self.simple_text
            .clone()
            .or_else(|| self.runs.first().map(|run| run.text.clone()))
            .filter(|text| !text.is_empty())
    }
}

/// True when the page is the cookie consent interstitial
pub fn is_consent_page(html: &str) -> bool {
    html.contains(CONSENT_FORM_MARKER)
}

/// Value the consent cookie must carry, read from the consent form
pub fn consent_value(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid regex"));
    re.captures(html).map(|caps| caps[1].to_string())
}

/// Build the track catalog for a video from its watch page HTML
pub fn extract(video_id: &str, html: &str) -> Result<TrackCatalog> {
    if is_consent_page(html) {
        tracing::debug!("Watch page of {} is a consent wall", video_id);
        return Err(TranscriptError::ConsentRequired {
            video_id: video_id.to_string(),
        });
    }

    let player = player_response(video_id, html)?;

    if let Some(status) = &player.playability_status {
        check_playability(video_id, status)?;
    }

    let renderer = player
        .captions
        .and_then(|captions| captions.player_captions_tracklist_renderer)
        .ok_or_else(|| TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        })?;

    let translation_languages: Vec<TranslationLanguage> = renderer
        .translation_languages
        .into_iter()
        .map(|lang| TranslationLanguage {
            language: lang
                .language_name
                .as_ref()
                .and_then(LocalizedText::text)
                .unwrap_or_else(|| lang.language_code.clone()),
            language_code: lang.language_code,
        })
        .collect();
    let catalog_translatable = !translation_languages.is_empty();

    let tracks: Vec<CaptionTrack> = renderer
        .caption_tracks
        .into_iter()
        .filter_map(|raw| {
            let (Some(language_code), Some(base_url)) = (raw.language_code, raw.base_url) else {
                tracing::warn!("Skipping caption track without language code or URL for {}", video_id);
                return None;
            };
            let is_translatable = catalog_translatable && raw.is_translatable;

            Some(CaptionTrack {
                video_id: video_id.to_string(),
                language: raw
                    .name
                    .as_ref()
                    .and_then(LocalizedText::text)
                    .unwrap_or_else(|| language_code.clone()),
                language_code,
                is_generated: raw.kind.as_deref() == Some("asr"),
                base_url: base_url.replace("&fmt=srv3", ""),
                is_translatable,
                translation_languages: if is_translatable {
                    translation_languages.clone()
                } else {
                    Vec::new()
                },
            })
        })
        .collect();

    let catalog = TrackCatalog::new(video_id, tracks, translation_languages);
    tracing::info!("Found {} caption tracks for {}", catalog.len(), video_id);
    Ok(catalog)
}

/// Deserialize the first marker assignment that looks like a player response.
///
/// Objects that fail the schema are skipped. Objects that parse but carry neither
/// playability nor captions are only used when nothing better follows.
fn player_response(video_id: &str, html: &str) -> Result<PlayerResponse> {
    let mut fallback = None;
    let mut parse_error = None;

    for blob in json_objects(html, PLAYER_RESPONSE_MARKER) {
        match serde_json::from_str::<PlayerResponse>(blob) {
            Ok(player) if player.playability_status.is_some() || player.captions.is_some() => {
                tracing::debug!("Found player response of {} bytes for {}", blob.len(), video_id);
                return Ok(player);
            }
            Ok(player) => {
                if fallback.is_none() {
                    fallback = Some(player);
                }
            }
            Err(e) => {
                tracing::debug!("Skipping {} candidate for {}: {}", PLAYER_RESPONSE_MARKER, video_id, e);
                parse_error = Some(e);
            }
        }
    }

    if let Some(player) = fallback {
        return Ok(player);
    }

    let detail = match parse_error {
        Some(e) => format!("player response does not parse: {}", e),
        None => format!("no {} object found", PLAYER_RESPONSE_MARKER),
    };
    Err(TranscriptError::PageStructureUnrecognized {
        video_id: video_id.to_string(),
        detail,
    })
}

fn check_playability(video_id: &str, playability: &PlayabilityStatus) -> Result<()> {
    let status = playability.status.as_deref().unwrap_or("OK");
    let reason = playability.reason.clone().unwrap_or_default();
    let video_id = video_id.to_string();

    match status {
        "OK" => Ok(()),
        "ERROR" => Err(TranscriptError::VideoUnavailable { video_id }),
        "AGE_CHECK_REQUIRED" | "AGE_VERIFICATION_REQUIRED" => {
            Err(TranscriptError::AgeRestricted { video_id })
        }
        "LOGIN_REQUIRED" if reason.contains("not a bot") => {
            Err(TranscriptError::IpBlocked { video_id })
        }
        "LOGIN_REQUIRED"
            if reason.contains("inappropriate for some users") || reason.contains("confirm your age") =>
        {
            Err(TranscriptError::AgeRestricted { video_id })
        }
        "LOGIN_REQUIRED" if reason.contains("private") => {
            Err(TranscriptError::VideoUnavailable { video_id })
        }
        other => {
            tracing::debug!("Video {} has playability status {}", video_id, other);
            Err(TranscriptError::VideoUnplayable {
                video_id,
                reason: if reason.is_empty() { other.to_string() } else { reason },
                sub_reasons: sub_reasons(playability.error_screen.as_ref()),
            })
        }
    }
}

fn sub_reasons(error_screen: Option<&Value>) -> Vec<String> {
    error_screen
        .and_then(|screen| screen.pointer("/playerErrorMessageRenderer/subreason"))
        .map(|subreason| {
            if let Some(text) = subreason.get("simpleText").and_then(Value::as_str) {
                return vec![text.to_string()];
            }
            subreason
                .get("runs")
                .and_then(Value::as_array)
                .map(|runs| {
                    runs.iter()
                        .filter_map(|run| run.get("text").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect::<Vec<String>>()
                })
                .unwrap_or_default()
        })
        .unwrap_or_default()
}
