use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::run_with_timeout;
use crate::config::TranscodeConfig;
use crate::{GistError, GistResult};

/// Transcodes an HLS manifest straight to mp3 with ffmpeg
pub struct HlsTranscoder {
    config: TranscodeConfig,
    timeout: Duration,
}

impl HlsTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        let timeout = config.timeout();
        Self { config, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_args(&self, manifest_url: &str, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            manifest_url.to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            self.config.audio_codec.clone(),
            "-b:a".to_string(),
            self.config.bitrate.clone(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Write the audio of `manifest_url` to `output`; ffmpeg's own output is discarded
    pub async fn transcode(&self, manifest_url: &str, output: &Path) -> GistResult<()> {
        tracing::info!("Transcoding {} -> {}", manifest_url, output.display());

        let mut command = Command::new(&self.config.ffmpeg_path);
        command
            .args(self.build_args(manifest_url, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let result = run_with_timeout(command, "ffmpeg", self.timeout).await?;

        if !result.status.success() {
            return Err(GistError::Transcode {
                status: result.status.code(),
            });
        }

        Ok(())
    }
}
