//! Now Gist - A Rust CLI tool that turns Now News links into a text gist and an MP3
//!
//! This library resolves `news.now.com` links to downloadable media, drives `yt-dlp` and
//! `ffmpeg` to produce audio, and formats the result as a short gist. Speech-to-text is
//! optional and delegated to an external faster-whisper CLI.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod session;
pub mod transcribe;
pub mod utils;

use std::path::PathBuf;
use std::time::Duration;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{HlsTranscoder, MediaMetadata, YtDlpExtractor};
pub use pipeline::{ExtractedAudio, GistPipeline, GistReport};
pub use provider::{is_known_provider, resolve, ManifestTarget, MediaReference};
pub use session::{Session, SessionKey};
pub use transcribe::{Transcriber, WhisperCliTranscriber};

/// Result type used by the binary and configuration layer
pub type Result<T> = anyhow::Result<T>;

/// Result type for pipeline operations that report a classified error
pub type GistResult<T> = std::result::Result<T, GistError>;

/// Error types specific to gist generation
#[derive(thiserror::Error, Debug)]
pub enum GistError {
    #[error("this link does not look like a Now link (news.now.com / now.com): {0}")]
    NotProvider(String),

    #[error("no newsId=<digits> found in URL: {0}")]
    MissingMediaId(String),

    #[error("{tool} is not installed or not on PATH")]
    ToolNotFound { tool: String },

    #[error("{message}")]
    Extraction { kind: String, message: String },

    #[error("ffmpeg exited with {}", .status.map(|s| format!("status {s}")).unwrap_or_else(|| "a signal".to_string()))]
    Transcode { status: Option<i32> },

    #[error("{tool} did not finish within {}s and was killed", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    #[error("download finished but no mp3 was found in {}; check that ffmpeg is installed on this host", .dir.display())]
    OutputMissing { dir: PathBuf },

    #[error("speech-to-text unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("speech-to-text failed: {0}")]
    Transcription(String),

    #[error("invalid metadata from yt-dlp: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GistError {
    /// Stable name of the error kind, shown in front of the message
    pub fn kind(&self) -> &str {
        match self {
            GistError::NotProvider(_) => "NotProvider",
            GistError::MissingMediaId(_) => "MissingMediaId",
            GistError::ToolNotFound { .. } => "ToolNotFound",
            GistError::Extraction { kind, .. } => kind,
            GistError::Transcode { .. } => "TranscodeFailed",
            GistError::Timeout { .. } => "Timeout",
            GistError::OutputMissing { .. } => "OutputMissing",
            GistError::TranscriptionUnavailable(_) => "TranscriptionUnavailable",
            GistError::Transcription(_) => "TranscriptionFailed",
            GistError::Metadata(_) => "MetadataError",
            GistError::Io(_) => "IoError",
        }
    }

    /// `"{kind}: {message}"`, the form surfaced to users
    pub fn classified(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }

    /// Input-shape errors are reported before any external tool runs
    pub fn is_input_error(&self) -> bool {
        matches!(self, GistError::NotProvider(_) | GistError::MissingMediaId(_))
    }
}
