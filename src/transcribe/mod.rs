use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::TranscriptionConfig;
use crate::extractors::run_with_timeout;
use crate::{GistError, GistResult};

/// Speech-to-text over a local audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Full transcript text of `audio_path`
    async fn transcribe(&self, audio_path: &Path) -> GistResult<String>;
}

/// Runs the faster-whisper command line (`whisper-ctranslate2`)
pub struct WhisperCliTranscriber {
    config: TranscriptionConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    pub fn build_args(&self, audio_path: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            audio_path.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.config.model.clone(),
            "--language".to_string(),
            self.config.language.clone(),
            "--vad_filter".to_string(),
            if self.config.vad_filter { "True" } else { "False" }.to_string(),
            "--device".to_string(),
            self.config.device.clone(),
            "--compute_type".to_string(),
            self.config.compute_type.clone(),
            "--output_format".to_string(),
            "txt".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> GistResult<String> {
        let output_dir = tempfile::Builder::new().prefix("now_gist_stt_").tempdir()?;

        tracing::info!("Transcribing {} with {}", audio_path.display(), self.config.command);

        let mut command = Command::new(&self.config.command);
        command
            .args(self.build_args(audio_path, output_dir.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = match run_with_timeout(command, &self.config.command, self.config.timeout()).await {
            Ok(output) => output,
            Err(GistError::ToolNotFound { tool }) => {
                return Err(GistError::TranscriptionUnavailable(format!(
                    "{tool} is not installed (pip install whisper-ctranslate2)"
                )))
            }
            Err(e) => return Err(GistError::Transcription(e.to_string())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().rfind(|l| !l.trim().is_empty()).unwrap_or("no output");
            return Err(GistError::Transcription(last_line.trim().to_string()));
        }

        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let transcript_path = output_dir.path().join(format!("{stem}.txt"));

        let raw = fs_err::read_to_string(&transcript_path)
            .map_err(|e| GistError::Transcription(e.to_string()))?;

        Ok(join_segments(&raw))
    }
}

/// One line per segment in whisper's txt output; segments are joined without separators
pub fn join_segments(raw: &str) -> String {
    raw.lines().map(str::trim).collect::<String>().trim().to_string()
}
