use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::captions::DEFAULT_FORMATTING_TAGS;
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP client settings
    pub http: HttpConfig,

    /// Transcript selection and parsing defaults
    pub transcript: TranscriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Accept-Language header; controls the language of track display names
    pub accept_language: String,

    /// Optional proxy URL (http, https or socks5)
    pub proxy: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptConfig {
    /// Language priority used when none is given on the command line
    pub default_languages: Vec<String>,

    /// Keep inline styling tags in cue text
    pub preserve_formatting: bool,

    /// Inline tags kept when formatting is preserved
    pub formatting_tags: Vec<String>,

    /// Default output format
    pub default_output_format: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            accept_language: "en-US".to_string(),
            proxy: None,
            timeout_secs: 30,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            default_languages: vec!["en".to_string()],
            preserve_formatting: false,
            formatting_tags: DEFAULT_FORMATTING_TAGS
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            default_output_format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            transcript: TranscriptConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs_err::read_to_string(config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    /// Save configuration to file
    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcript").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be greater than zero");
        }

        if let Some(proxy) = &self.http.proxy {
            url::Url::parse(proxy)
                .with_context(|| format!("Invalid proxy URL: {}", proxy))?;
        }

        if self.transcript.default_languages.is_empty() {
            anyhow::bail!("At least one default language must be configured");
        }

        if self
            .transcript
            .formatting_tags
            .iter()
            .any(|tag| tag.trim().is_empty())
        {
            anyhow::bail!("Formatting tag names must not be empty");
        }

        self.transcript
            .default_output_format
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)
            .with_context(|| {
                format!(
                    "Invalid default output format: {}",
                    self.transcript.default_output_format
                )
            })?;

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  User-Agent: {}", self.http.user_agent);
        println!("  Accept-Language: {}", self.http.accept_language);
        if let Some(proxy) = &self.http.proxy {
            println!("  Proxy: {}", proxy);
        }
        println!("  Timeout: {}s", self.http.timeout_secs);
        println!("  Languages: {}", self.transcript.default_languages.join(", "));
        println!("  Preserve Formatting: {}", self.transcript.preserve_formatting);
        println!("  Formatting Tags: {}", self.transcript.formatting_tags.join(", "));
        println!("  Default Format: {}", self.transcript.default_output_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transcript.default_languages.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transcript.formatting_tags.push("  ".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http.proxy = Some("not a url".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transcript.default_output_format = "docx".to_string();
        assert!(config.validate().is_err());

        config.transcript.default_output_format = "SRT".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_reads_custom_languages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.transcript.default_languages = vec!["de".to_string(), "en".to_string()];
        config.http.proxy = Some("socks5://127.0.0.1:9050".to_string());
        fs_err::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.transcript.default_languages, vec!["de", "en"]);
        assert_eq!(loaded.http.proxy.as_deref(), Some("socks5://127.0.0.1:9050"));
    }
}
