use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript::cli::{Cli, Commands, OutputFormat};
use yt_transcript::config::Config;
use yt_transcript::{output, utils, FetchedTranscript, TrackFilter, TranscriptApi};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "yt_transcript=debug"
    } else {
        "yt_transcript=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Fetch {
            videos,
            languages,
            translate,
            format,
            output,
            preserve_formatting,
            manual_only,
            generated_only,
            timestamps,
        } => {
            let languages = if languages.is_empty() {
                config.transcript.default_languages.clone()
            } else {
                languages
            };
            let format = match format {
                Some(format) => format,
                None => config
                    .transcript
                    .default_output_format
                    .parse::<OutputFormat>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid default output format in config")?,
            };
            let request = FetchRequest {
                languages,
                translate,
                filter: TrackFilter {
                    manual_only,
                    generated_only,
                },
                preserve_formatting: preserve_formatting || config.transcript.preserve_formatting,
            };

            let api = TranscriptApi::from_config(&config)?;
            let transcripts = fetch_batch(&api, &videos, &request, cli.quiet).await?;

            if !transcripts.is_empty() {
                match output {
                    Some(path) => {
                        let path = output::save_to_file(&transcripts, &path, &format, timestamps)?;
                        println!("Transcript saved to: {}", path.display());
                    }
                    None => {
                        output::print_to_console(&transcripts, &format, timestamps)?;
                    }
                }
            }

            if transcripts.len() < videos.len() {
                anyhow::bail!(
                    "{} of {} videos could not be fetched",
                    videos.len() - transcripts.len(),
                    videos.len()
                );
            }
        }
        Commands::List { videos } => {
            let api = TranscriptApi::from_config(&config)?;
            let mut failures = 0;

            for input in &videos {
                let result = match utils::extract_video_id(input) {
                    Ok(video_id) => api.list(&video_id).await,
                    Err(err) => Err(err),
                };
                match result {
                    Ok(catalog) => println!("{}", catalog),
                    Err(err) => {
                        failures += 1;
                        eprintln!("✗ {}: {}", input, err);
                        if err.should_back_off() {
                            break;
                        }
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} of {} videos could not be listed", failures, videos.len());
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

struct FetchRequest {
    languages: Vec<String>,
    translate: Option<String>,
    filter: TrackFilter,
    preserve_formatting: bool,
}

/// Fetch every video in turn; a failing video is reported and skipped, throttling stops the batch
async fn fetch_batch(
    api: &TranscriptApi<yt_transcript::ReqwestTransport>,
    videos: &[String],
    request: &FetchRequest,
    quiet: bool,
) -> Result<Vec<FetchedTranscript>> {
    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    };

    let mut transcripts = Vec::new();
    for (index, input) in videos.iter().enumerate() {
        progress.set_message(format!("Fetching {} ({}/{})", input, index + 1, videos.len()));

        let video_id = match utils::extract_video_id(input) {
            Ok(video_id) => video_id,
            Err(err) => {
                progress.suspend(|| eprintln!("✗ {}", err));
                continue;
            }
        };

        let result = match &request.translate {
            Some(target) => {
                api.translate(
                    &video_id,
                    &request.languages,
                    request.filter,
                    target,
                    request.preserve_formatting,
                )
                .await
            }
            None => {
                api.fetch(
                    &video_id,
                    &request.languages,
                    request.filter,
                    request.preserve_formatting,
                )
                .await
            }
        };

        match result {
            Ok(transcript) => {
                let length = transcript.cues.last().map(|cue| cue.end()).unwrap_or(0.0);
                tracing::info!(
                    "Fetched {} cues ({}) for {} in {}",
                    transcript.cues.len(),
                    utils::format_duration(length),
                    video_id,
                    transcript.language_code
                );
                transcripts.push(transcript);
            }
            Err(err) => {
                progress.suspend(|| eprintln!("✗ {}", err));
                if err.should_back_off() {
                    progress.suspend(|| eprintln!("Stopping batch: YouTube is throttling this client"));
                    break;
                }
            }
        }
    }

    progress.finish_and_clear();
    Ok(transcripts)
}
