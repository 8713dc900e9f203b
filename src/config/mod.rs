use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Which site is accepted and how its manifests are addressed
    pub provider: ProviderConfig,

    /// yt-dlp extraction settings
    pub extraction: ExtractionConfig,

    /// Direct ffmpeg transcode settings
    pub transcode: TranscodeConfig,

    /// Optional speech-to-text
    pub transcription: TranscriptionConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Name printed in front of the gist title
    pub media_name: String,

    /// Substrings that mark a URL as belonging to the provider
    pub host_fragments: Vec<String>,

    /// Base URL the HLS manifest path is appended to
    pub manifest_host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Format selector
    pub format: String,

    /// Retry count passed through to yt-dlp
    pub retries: u32,

    /// Socket timeout in seconds
    pub socket_timeout_secs: u64,

    /// MP3 bitrate for the post-processing step, in kbps
    pub audio_quality_kbps: u32,

    /// Upper bound for the whole yt-dlp run, in seconds
    pub timeout_secs: u64,

    /// Passed as --ffmpeg-location when set
    pub ffmpeg_location: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Audio codec
    pub audio_codec: String,

    /// Audio bitrate, e.g. "128k"
    pub bitrate: String,

    /// Upper bound for one ffmpeg run, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Run speech-to-text unless overridden on the command line
    pub enabled: bool,

    /// faster-whisper CLI executable
    pub command: String,

    /// Model size
    pub model: String,

    /// Language hint
    pub language: String,

    /// Drop non-speech segments before decoding
    pub vad_filter: bool,

    pub device: String,

    pub compute_type: String,

    /// Upper bound for one speech-to-text run, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Parent directory for per-request working directories
    pub temp_dir: Option<PathBuf>,

    /// Offset from UTC used for publish times, in hours
    pub utc_offset_hours: i32,

    /// Default output format
    pub default_output_format: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            media_name: "Now".to_string(),
            host_fragments: crate::provider::DEFAULT_HOST_FRAGMENTS
                .iter()
                .map(|host| host.to_string())
                .collect(),
            manifest_host: crate::provider::DEFAULT_MANIFEST_HOST.to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            retries: 2,
            socket_timeout_secs: 20,
            audio_quality_kbps: 192,
            timeout_secs: 600,
            ffmpeg_location: None,
        }
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            audio_codec: "libmp3lame".to_string(),
            bitrate: "128k".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "whisper-ctranslate2".to_string(),
            model: "tiny".to_string(),
            language: "zh".to_string(),
            vad_filter: true,
            device: "cpu".to_string(),
            compute_type: "int8".to_string(),
            timeout_secs: 1800,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            utc_offset_hours: 8,
            default_output_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, the usual locations, or create default
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::debug!("Wrote default config to {}", config_path.display());
            Ok(config)
        }
    }

    /// Read and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        Self::from_yaml(&content)
    }

    /// Parse and validate YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
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

        Ok(config_dir.join("now-gist").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.host_fragments.iter().all(|h| h.trim().is_empty()) {
            anyhow::bail!("provider.host_fragments must contain at least one host");
        }

        let manifest_host = Url::parse(&self.provider.manifest_host)
            .with_context(|| format!("provider.manifest_host is not a URL: {}", self.provider.manifest_host))?;
        if !matches!(manifest_host.scheme(), "http" | "https") {
            anyhow::bail!("provider.manifest_host must use HTTP or HTTPS");
        }

        let bitrate = self.transcode.bitrate.trim_end_matches('k');
        if bitrate.is_empty() || !bitrate.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("transcode.bitrate must look like \"128k\", got {:?}", self.transcode.bitrate);
        }

        if self.transcode.timeout_secs == 0
            || self.extraction.timeout_secs == 0
            || self.transcription.timeout_secs == 0
        {
            anyhow::bail!("timeouts must be at least one second");
        }

        if !matches!(self.app.default_output_format.as_str(), "text" | "json") {
            anyhow::bail!("app.default_output_format must be \"text\" or \"json\"");
        }

        if !(-12..=14).contains(&self.app.utc_offset_hours) {
            anyhow::bail!("app.utc_offset_hours must be between -12 and 14");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Media Name: {}", self.provider.media_name);
        println!("  Hosts: {}", self.provider.host_fragments.join(", "));
        println!("  Manifest Host: {}", self.provider.manifest_host);
        println!("  yt-dlp: {} (retries {}, socket timeout {}s)",
            self.extraction.yt_dlp_path, self.extraction.retries, self.extraction.socket_timeout_secs);
        println!("  ffmpeg: {} ({} @ {}, timeout {}s)",
            self.transcode.ffmpeg_path, self.transcode.audio_codec, self.transcode.bitrate, self.transcode.timeout_secs);
        println!("  Speech-to-text: {} ({} / {}, timeout {}s)",
            if self.transcription.enabled { "on" } else { "off" },
            self.transcription.command, self.transcription.model, self.transcription.timeout_secs);
        println!("  UTC Offset: {:+}h", self.app.utc_offset_hours);
        if let Some(dir) = &self.app.temp_dir {
            println!("  Temp Dir: {}", dir.display());
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
