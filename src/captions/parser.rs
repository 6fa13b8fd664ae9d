use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::{Cue, CueSequence};
use crate::{Result, TranscriptError};

/// Inline tags kept when formatting is preserved
pub const DEFAULT_FORMATTING_TAGS: &[&str] = &[
    "strong", "em", "b", "i", "u", "mark", "small", "del", "ins", "sub", "sup",
];

fn transcript_root() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<transcript[\s>/]").expect("valid regex"))
}

fn text_element() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text\s*>)").expect("valid regex"))
}

fn attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("valid regex"))
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn tag_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^</?\s*([A-Za-z][A-Za-z0-9]*)\b").expect("valid regex"))
}

/// Turns a timedtext XML document into cues
#[derive(Debug, Clone)]
pub struct CueParser {
    preserve_formatting: bool,
    formatting_tags: HashSet<String>,
}

impl CueParser {
    pub fn new(preserve_formatting: bool) -> Self {
        Self::with_formatting_tags(preserve_formatting, DEFAULT_FORMATTING_TAGS.iter().copied())
    }

    /// Use a custom allow-list of inline tags
    pub fn with_formatting_tags<I, S>(preserve_formatting: bool, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            preserve_formatting,
            formatting_tags: tags
                .into_iter()
                .map(|tag| tag.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Parse a caption document.
    ///
    /// Fails with `NoTranscriptFound` when the body is not a caption document at all and
    /// with `CaptionDocumentMalformed` when a timing attribute cannot be read.
    pub fn parse(&self, video_id: &str, xml: &str) -> Result<CueSequence> {
        if xml.trim().is_empty() || !transcript_root().is_match(xml) {
            tracing::warn!("Caption response for {} is not a timedtext document", video_id);
            return Err(TranscriptError::NoTranscriptFound {
                video_id: video_id.to_string(),
                requested: Vec::new(),
                available: Vec::new(),
            });
        }

        text_element()
            .captures_iter(xml)
            .map(|element| {
                let attributes = element.get(1).map_or("", |m| m.as_str());
                let start = timing(video_id, attributes, "start")?.ok_or_else(|| {
                    TranscriptError::CaptionDocumentMalformed {
                        video_id: video_id.to_string(),
                        detail: format!("cue without start attribute: <text{}>", attributes),
                    }
                })?;
                let duration = timing(video_id, attributes, "dur")?.unwrap_or(0.0);
                let raw = element.get(2).map_or("", |m| m.as_str());

                Ok(Cue {
                    text: self.clean_text(raw),
                    start,
                    duration,
                })
            })
            .collect()
    }

    /// Decode entities and apply the tag policy to one cue's raw content
    pub fn clean_text(&self, raw: &str) -> String {
        // Cue text is escaped once for XML and once more for HTML.
        let once = html_escape::decode_html_entities(raw);
        let decoded = html_escape::decode_html_entities(&once);

        if self.preserve_formatting {
            // Same tokens as `strip_tags`, so stripping the result gives the plain text.
            any_tag()
                .replace_all(&decoded, |caps: &Captures| {
                    let tag = &caps[0];
                    let allowed = tag_name()
                        .captures(tag)
                        .is_some_and(|name| self.formatting_tags.contains(&name[1].to_ascii_lowercase()));
                    if allowed {
                        tag.to_string()
                    } else {
                        String::new()
                    }
                })
                .into_owned()
        } else {
            strip_tags(&decoded)
        }
    }
}

impl Default for CueParser {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Remove every markup tag from a string
pub fn strip_tags(text: &str) -> String {
    any_tag().replace_all(text, "").into_owned()
}

fn timing(video_id: &str, attributes: &str, name: &str) -> Result<Option<f64>> {
    let Some(raw) = attribute()
        .captures_iter(attributes)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string())
    else {
        return Ok(None);
    };

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        _ => Err(TranscriptError::CaptionDocumentMalformed {
            video_id: video_id.to_string(),
            detail: format!("invalid {} value {:?}", name, raw),
        }),
    }
}
