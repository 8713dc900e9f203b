use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{find_first_with_extension, run_with_timeout, MediaMetadata};
use crate::config::ExtractionConfig;
use crate::{GistError, GistResult};

/// Downloads and transcodes provider media with yt-dlp
pub struct YtDlpExtractor {
    config: ExtractionConfig,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        let timeout = config.timeout();
        Self { config, timeout }
    }

    /// yt-dlp arguments for one download into `workdir`
    pub fn build_args(&self, url: &str, workdir: &Path) -> Vec<String> {
        let outtmpl = workdir.join("%(id)s.%(ext)s");

        let mut args = vec![
            "--format".to_string(),
            self.config.format.clone(),
            "--output".to_string(),
            outtmpl.to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--retries".to_string(),
            self.config.retries.to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_secs.to_string(),
            // Post-process to mp3; needs ffmpeg on the host
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", self.config.audio_quality_kbps),
            // Print the info JSON while still downloading
            "--no-simulate".to_string(),
            "--dump-json".to_string(),
        ];

        if let Some(location) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().into_owned());
        }

        args.push(url.to_string());
        args
    }

    /// Download `url` as mp3 into `workdir`.
    ///
    /// yt-dlp does not reliably report the post-processed file name, so the
    /// result is found by scanning `workdir` afterwards.
    pub async fn extract_and_transcode(
        &self,
        url: &str,
        workdir: &Path,
    ) -> GistResult<(PathBuf, MediaMetadata)> {
        tracing::debug!("Running yt-dlp for {} in {}", url, workdir.display());

        let mut command = Command::new(&self.config.yt_dlp_path);
        command
            .args(self.build_args(url, workdir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = run_with_timeout(command, "yt-dlp", self.timeout).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("yt-dlp failed: {}", stderr.trim());
            let (kind, message) = classify_ytdlp_error(&stderr);
            return Err(GistError::Extraction {
                kind: kind.to_string(),
                message,
            });
        }

        let metadata = MediaMetadata::from_ytdlp_stdout(&String::from_utf8_lossy(&output.stdout))?;

        match find_first_with_extension(workdir, "mp3")? {
            Some(path) => {
                tracing::info!("yt-dlp produced {}", path.display());
                Ok((path, metadata))
            }
            None => Err(GistError::OutputMissing {
                dir: workdir.to_path_buf(),
            }),
        }
    }
}

/// Pick an error kind and a one-line message out of yt-dlp's stderr
pub fn classify_ytdlp_error(stderr: &str) -> (&'static str, String) {
    let message = stderr
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).rfind(|line| !line.is_empty()))
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| "yt-dlp exited without an error message".to_string());

    let lower = message.to_lowercase();
    let kind = if lower.contains("unsupported url") {
        "UnsupportedUrl"
    } else if lower.contains("timed out") || lower.contains("timeout") {
        "NetworkTimeout"
    } else if lower.contains("http error") {
        "HttpError"
    } else if lower.contains("unavailable") || lower.contains("not available") || lower.contains("private") {
        "MediaUnavailable"
    } else if lower.contains("ffmpeg") || lower.contains("ffprobe") {
        "PostProcessingError"
    } else {
        "DownloadError"
    };

    (kind, message)
}
