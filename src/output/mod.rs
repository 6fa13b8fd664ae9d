use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::api::FetchedTranscript;
use crate::cli::OutputFormat;

pub mod formatters;

pub use formatters::*;

/// Pick the formatter for an output format
pub fn formatter_for(format: &OutputFormat, timestamps: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter { timestamps }),
        OutputFormat::Json => Box::new(JsonFormatter { pretty: true }),
        OutputFormat::Srt => Box::new(SrtFormatter),
        OutputFormat::Vtt => Box::new(WebVttFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Save transcripts to file, adding the format's extension when the path has none.
///
/// Returns the path actually written.
pub fn save_to_file(
    transcripts: &[FetchedTranscript],
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<PathBuf> {
    let formatter = formatter_for(format, include_timestamps);
    let content = formatter.format_many(transcripts)?;

    let mut path = path.to_path_buf();
    if path.extension().is_none() {
        path.set_extension(formatter.extension());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(&path, content)?;
    Ok(path)
}

/// Print transcripts to console
pub fn print_to_console(
    transcripts: &[FetchedTranscript],
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = formatter_for(format, include_timestamps).format_many(transcripts)?;

    println!("{}", content);
    Ok(())
}
