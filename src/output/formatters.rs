use anyhow::{Context, Result};

use crate::api::FetchedTranscript;
use crate::captions::Cue;

/// Turns fetched transcripts into a string in one output format
pub trait Formatter {
    /// Format a single transcript
    fn format(&self, transcript: &FetchedTranscript) -> Result<String>;

    /// Format several transcripts into one document
    fn format_many(&self, transcripts: &[FetchedTranscript]) -> Result<String> {
        let parts = transcripts
            .iter()
            .map(|transcript| self.format(transcript))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("\n\n"))
    }

    /// File extension for this format
    fn extension(&self) -> &'static str;
}

/// Timestamp as `HH:MM:SS` plus milliseconds joined by `separator`
fn clock_timestamp(seconds: f64, separator: char) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, millis)
}

/// Cue end clamped to the next cue's start, so consecutive cues never overlap
fn cue_end(cues: &[Cue], index: usize) -> f64 {
    let cue = &cues[index];
    match cues.get(index + 1) {
        Some(next) if next.start < cue.end() && next.start >= cue.start => next.start,
        _ => cue.end(),
    }
}

/// Plain text, one cue per line
#[derive(Debug, Default, Clone)]
pub struct TextFormatter {
    /// Prefix each line with `[MM:SS]`
    pub timestamps: bool,
}

impl Formatter for TextFormatter {
    fn format(&self, transcript: &FetchedTranscript) -> Result<String> {
        let lines: Vec<String> = transcript
            .cues
            .iter()
            .map(|cue| {
                if self.timestamps {
                    let total = cue.start as u64;
                    format!("[{:02}:{:02}] {}", total / 60, total % 60, cue.text)
                } else {
                    cue.text.clone()
                }
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn format_many(&self, transcripts: &[FetchedTranscript]) -> Result<String> {
        let parts = transcripts
            .iter()
            .map(|transcript| self.format(transcript))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("\n\n\n"))
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

/// JSON list of `{text, start, duration}` records
#[derive(Debug, Default, Clone)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    fn render<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value).context("Failed to serialize transcript")
        } else {
            serde_json::to_string(value).context("Failed to serialize transcript")
        }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, transcript: &FetchedTranscript) -> Result<String> {
        self.render(&transcript.cues)
    }

    fn format_many(&self, transcripts: &[FetchedTranscript]) -> Result<String> {
        let all: Vec<&Vec<Cue>> = transcripts.iter().map(|t| &t.cues).collect();
        self.render(&all)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// SubRip subtitles
#[derive(Debug, Default, Clone)]
pub struct SrtFormatter;

impl Formatter for SrtFormatter {
    fn format(&self, transcript: &FetchedTranscript) -> Result<String> {
        let cues = &transcript.cues;
        let blocks: Vec<String> = (0..cues.len())
            .map(|index| {
                format!(
                    "{}\n{} --> {}\n{}",
                    index + 1,
                    clock_timestamp(cues[index].start, ','),
                    clock_timestamp(cue_end(cues, index), ','),
                    cues[index].text
                )
            })
            .collect();
        Ok(format!("{}\n", blocks.join("\n\n")))
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// WebVTT subtitles
#[derive(Debug, Default, Clone)]
pub struct WebVttFormatter;

impl Formatter for WebVttFormatter {
    fn format(&self, transcript: &FetchedTranscript) -> Result<String> {
        let cues = &transcript.cues;
        let blocks: Vec<String> = (0..cues.len())
            .map(|index| {
                format!(
                    "{} --> {}\n{}",
                    clock_timestamp(cues[index].start, '.'),
                    clock_timestamp(cue_end(cues, index), '.'),
                    cues[index].text
                )
            })
            .collect();
        Ok(format!("WEBVTT\n\n{}\n", blocks.join("\n\n")))
    }

    fn extension(&self) -> &'static str {
        "vtt"
    }
}

/// CSV with a `video_id,start,duration,text` header
#[derive(Debug, Default, Clone)]
pub struct CsvFormatter;

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl Formatter for CsvFormatter {
    fn format(&self, transcript: &FetchedTranscript) -> Result<String> {
        self.format_many(std::slice::from_ref(transcript))
    }

    fn format_many(&self, transcripts: &[FetchedTranscript]) -> Result<String> {
        let mut out = String::from("video_id,start,duration,text\n");
        for transcript in transcripts {
            for cue in &transcript.cues {
                out.push_str(&format!(
                    "{},{:.3},{:.3},{}\n",
                    csv_field(&transcript.video_id),
                    cue.start,
                    cue.duration,
                    csv_field(&cue.text)
                ));
            }
        }
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> FetchedTranscript {
        FetchedTranscript {
            video_id: "vid".to_string(),
            language: "English".to_string(),
            language_code: "en".to_string(),
            is_generated: false,
            cues: vec![
                Cue {
                    text: "Hello, \"world\"".to_string(),
                    start: 0.0,
                    duration: 1.5,
                },
                Cue {
                    text: "second".to_string(),
                    start: 1.0,
                    duration: 0.0,
                },
                Cue {
                    text: "third".to_string(),
                    start: 3661.25,
                    duration: 2.0,
                },
            ],
        }
    }

    #[test]
    fn test_clock_timestamp() {
        assert_eq!(clock_timestamp(0.0, ','), "00:00:00,000");
        assert_eq!(clock_timestamp(3661.25, '.'), "01:01:01.250");
    }

    #[test]
    fn test_text_formatter() {
        let plain = TextFormatter::default().format(&transcript()).unwrap();
        assert_eq!(plain, "Hello, \"world\"\nsecond\nthird");

        let stamped = TextFormatter { timestamps: true }.format(&transcript()).unwrap();
        assert_eq!(stamped.lines().last(), Some("[61:01] third"));
    }

    #[test]
    fn test_json_formatter_uses_cue_fields() {
        let json = JsonFormatter::default().format(&transcript()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["text"], "Hello, \"world\"");
        assert_eq!(value[0]["start"], 0.0);
        assert_eq!(value[0]["duration"], 1.5);
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_srt_clamps_overlapping_cues() {
        let srt = SrtFormatter.format(&transcript()).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,000\nHello, \"world\"\n\n2\n"));
        assert!(srt.contains("2\n00:00:01,000 --> 00:00:01,000\nsecond"));
        assert!(srt.ends_with("01:01:01,250 --> 01:01:03,250\nthird\n"));
    }

    #[test]
    fn test_vtt_header() {
        let vtt = WebVttFormatter.format(&transcript()).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n"));
    }

    #[test]
    fn test_csv_quotes_fields() {
        let csv = CsvFormatter.format(&transcript()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "video_id,start,duration,text");
        assert_eq!(lines[1], "vid,0.000,1.500,\"Hello, \"\"world\"\"\"");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_format_many_json_nests_lists() {
        let json = JsonFormatter::default()
            .format_many(&[transcript(), transcript()])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
