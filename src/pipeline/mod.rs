//! End-to-end flows: page link -> gist + mp3, and manifest -> mp3.

use chrono::FixedOffset;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::Config;
use crate::extractors::{find_first_with_extension, HlsTranscoder, MediaMetadata, YtDlpExtractor};
use crate::output::{build_summary, format_publish_time, regional_offset, UNTITLED};
use crate::provider::{is_known_provider_with, resolve_with, ManifestTarget};
use crate::transcribe::{Transcriber, WhisperCliTranscriber};
use crate::utils::safe_filename;
use crate::{GistError, GistResult};

/// Audio ready to hand to the user
#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExtractedAudio {
    /// Read `path`, presenting it as `filename`
    pub async fn read(path: &Path, filename: String) -> GistResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { filename, bytes })
    }

    /// Write into `dir` under the display file name
    pub async fn save_into(&self, dir: &Path) -> GistResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Everything one gist run produced.
///
/// The working directory is owned here so the mp3 stays on disk until the
/// report (or whatever takes its `workdir`) is dropped.
#[derive(Debug)]
pub struct GistReport {
    pub url: String,
    pub title: String,
    pub publish_time: String,
    pub transcript: String,
    pub gist_text: String,
    pub mp3_name: String,
    pub metadata: MediaMetadata,
    /// Non-fatal problems, such as speech-to-text being unavailable
    pub warnings: Vec<String>,
    pub workdir: TempDir,
}

impl GistReport {
    /// Re-scan the working directory and load the mp3
    pub async fn audio(&self) -> GistResult<ExtractedAudio> {
        load_audio(self.workdir.path(), &self.mp3_name).await
    }
}

pub(crate) async fn load_audio(workdir: &Path, filename: &str) -> GistResult<ExtractedAudio> {
    let path = find_first_with_extension(workdir, "mp3")?
        .ok_or_else(|| GistError::OutputMissing { dir: workdir.to_path_buf() })?;
    ExtractedAudio::read(&path, filename.to_string()).await
}

pub struct GistPipeline {
    config: Config,
    extractor: YtDlpExtractor,
    transcoder: HlsTranscoder,
    transcriber: Arc<dyn Transcriber>,
    offset: FixedOffset,
    show_progress: bool,
}

impl GistPipeline {
    pub fn new(config: Config) -> Self {
        let transcriber = Arc::new(WhisperCliTranscriber::new(config.transcription.clone()));
        Self::with_transcriber(config, transcriber)
    }

    pub fn with_transcriber(config: Config, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            extractor: YtDlpExtractor::new(config.extraction.clone()),
            transcoder: HlsTranscoder::new(config.transcode.clone()),
            offset: regional_offset(config.app.utc_offset_hours),
            transcriber,
            config,
            show_progress: false,
        }
    }

    /// Show spinners on stderr while external tools run
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Override the ffmpeg timeout for the manifest path
    pub fn with_transcode_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.transcoder = HlsTranscoder::new(self.config.transcode.clone()).with_timeout(timeout);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    /// Validate `url`, download and transcode through yt-dlp, and build the gist
    pub async fn generate(&self, url: &str, enable_transcription: bool) -> GistResult<GistReport> {
        let url = url.trim();
        if !is_known_provider_with(url, &self.config.provider) {
            return Err(GistError::NotProvider(url.to_string()));
        }

        let workdir = self.workdir()?;
        tracing::info!("Generating gist for {} in {}", url, workdir.path().display());

        let spinner = self.spinner("Downloading audio with yt-dlp + ffmpeg...");
        let result = self.extractor.extract_and_transcode(url, workdir.path()).await;
        spinner.finish_and_clear();
        let (mp3_path, metadata) = result?;

        let title = metadata.clean_title().unwrap_or(UNTITLED).to_string();
        let publish_time = format_publish_time(&metadata, &self.offset);

        let mut warnings = Vec::new();
        let transcript = if enable_transcription {
            let spinner = self.spinner("Transcribing audio...");
            let result = self.transcriber.transcribe(&mp3_path).await;
            spinner.finish_and_clear();
            match result {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Speech-to-text skipped: {}", e);
                    warnings.push(e.classified());
                    String::new()
                }
            }
        } else {
            String::new()
        };

        let gist_text = build_summary(
            &self.config.provider.media_name,
            &title,
            &publish_time,
            &transcript,
            url,
        );

        Ok(GistReport {
            url: url.to_string(),
            mp3_name: format!("{}.mp3", safe_filename(&title)),
            title,
            publish_time,
            transcript,
            gist_text,
            metadata,
            warnings,
            workdir,
        })
    }

    /// Validate `url` and derive its manifest without touching the network
    pub fn resolve(&self, url: &str) -> GistResult<ManifestTarget> {
        let url = url.trim();
        if !is_known_provider_with(url, &self.config.provider) {
            return Err(GistError::NotProvider(url.to_string()));
        }
        resolve_with(url, &self.config.provider.manifest_host)
            .ok_or_else(|| GistError::MissingMediaId(url.to_string()))
    }

    /// Transcode the manifest behind `url` to `now_{id}.mp3`.
    ///
    /// The scratch directory is removed on every exit path.
    pub async fn manifest_audio(&self, url: &str) -> GistResult<ExtractedAudio> {
        let target = self.resolve(url)?;
        let workdir = self.workdir()?;
        let filename = target.media.audio_filename();
        let output = workdir.path().join(&filename);

        let spinner = self.spinner("Transcoding HLS stream with ffmpeg...");
        let result = self.transcoder.transcode(&target.manifest_url, &output).await;
        spinner.finish_and_clear();
        result?;

        if !output.is_file() {
            return Err(GistError::OutputMissing { dir: workdir.path().to_path_buf() });
        }

        ExtractedAudio::read(&output, filename).await
    }

    fn workdir(&self) -> GistResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("now_gist_");
        let dir = match &self.config.app.temp_dir {
            Some(parent) => {
                fs_err::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(style);
        }
        progress.set_message(message);
        progress.enable_steady_tick(std::time::Duration::from_millis(120));
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::MockTranscriber;

    fn pipeline() -> GistPipeline {
        GistPipeline::with_transcriber(Config::default(), Arc::new(MockTranscriber::new()))
    }

    #[tokio::test]
    async fn test_generate_rejects_foreign_url() {
        let err = pipeline().generate("https://www.youtube.com/watch?v=1", false).await.unwrap_err();
        assert_eq!(err.kind(), "NotProvider");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_url() {
        let err = pipeline().generate("   ", false).await.unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_resolve_classifies_input_errors() {
        let pipeline = pipeline();
        assert_eq!(pipeline.resolve("https://example.com/?newsId=1").unwrap_err().kind(), "NotProvider");
        assert_eq!(pipeline.resolve("https://news.now.com/home").unwrap_err().kind(), "MissingMediaId");

        let target = pipeline.resolve(" https://news.now.com/home/local/player?newsId=632067 ").unwrap();
        assert_eq!(target.manifest_url, "https://news-videos.now.com/nownews/632067/hls/632067.m3u8");
    }

    #[tokio::test]
    async fn test_manifest_audio_missing_id_runs_nothing() {
        let err = pipeline().manifest_audio("https://news.now.com/home").await.unwrap_err();
        assert_eq!(err.kind(), "MissingMediaId");
    }

    #[tokio::test]
    async fn test_workdir_under_configured_parent() {
        let parent = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.app.temp_dir = Some(parent.path().join("work"));
        let pipeline = GistPipeline::with_transcriber(config, Arc::new(MockTranscriber::new()));

        let dir = pipeline.workdir().unwrap();
        assert!(dir.path().starts_with(parent.path().join("work")));
        assert!(dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("now_gist_"));
    }

    #[tokio::test]
    async fn test_report_audio_reads_mp3() {
        let workdir = tempfile::tempdir().unwrap();
        fs_err::write(workdir.path().join("632067.mp3"), b"ID3data").unwrap();
        let report = GistReport {
            url: "u".into(),
            title: "t".into(),
            publish_time: "—".into(),
            transcript: String::new(),
            gist_text: String::new(),
            mp3_name: "t.mp3".into(),
            metadata: MediaMetadata::default(),
            warnings: vec![],
            workdir,
        };
        let audio = report.audio().await.unwrap();
        assert_eq!(audio.filename, "t.mp3");
        assert_eq!(audio.bytes, b"ID3data");

        let out = tempfile::tempdir().unwrap();
        let saved = audio.save_into(out.path()).await.unwrap();
        assert_eq!(saved, out.path().join("t.mp3"));
    }
}
