use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-transcript",
    about = "Fetch YouTube captions and transcripts without the official API",
    version,
    long_about = "Lists the caption tracks of YouTube videos and downloads them as text, JSON, SRT, WebVTT or CSV. Tracks are chosen by language priority, manual captions before automatic ones, and can be machine-translated by YouTube on the fly."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE", env = "YT_TRANSCRIPT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download transcripts for one or more videos
    Fetch {
        /// Video ids or URLs (watch, youtu.be, embed and shorts links)
        #[arg(value_name = "VIDEO", required = true)]
        videos: Vec<String>,

        /// Language codes in order of preference, repeated or comma separated (defaults to the configured list)
        #[arg(short, long = "language", value_name = "LANG", value_delimiter = ',')]
        languages: Vec<String>,

        /// Machine-translate the selected transcript into this language
        #[arg(short, long, value_name = "LANG")]
        translate: Option<String>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path; the format's extension is added when missing (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep inline styling tags such as <i> and <b>
        #[arg(long)]
        preserve_formatting: bool,

        /// Only use manually created transcripts
        #[arg(long, conflicts_with = "generated_only")]
        manual_only: bool,

        /// Only use automatically generated transcripts
        #[arg(long)]
        generated_only: bool,

        /// Include [MM:SS] timestamps in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// List the available transcripts of one or more videos
    List {
        /// Video ids or URLs
        #[arg(value_name = "VIDEO", required = true)]
        videos: Vec<String>,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <OutputFormat as ValueEnum>::from_str(s, true)
    }
}
