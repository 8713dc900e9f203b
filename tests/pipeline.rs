//! Pipeline runs against small shell scripts standing in for yt-dlp and ffmpeg.
#![cfg(unix)]

use async_trait::async_trait;
use mockall::mock;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use now_gist::config::Config;
use now_gist::output::{CONTENT_PLACEHOLDER, UNTITLED};
use now_gist::pipeline::GistPipeline;
use now_gist::session::{Session, SessionKey};
use now_gist::transcribe::Transcriber;
use now_gist::{GistError, GistResult};

mock! {
    pub Stt {}

    #[async_trait]
    impl Transcriber for Stt {
        async fn transcribe(&self, audio_path: &Path) -> GistResult<String>;
    }
}

const URL: &str = "https://news.now.com/home/local/player?newsId=632067";

/// Write an executable script and return its path
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs_err::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake yt-dlp: writes `<id>.mp3` next to the --output template when `write_mp3`, then prints `json`
fn fake_ytdlp(dir: &Path, json: &str, write_mp3: bool) -> PathBuf {
    let touch = if write_mp3 { r#"printf 'ID3fake' > "$(dirname "$out")/632067.mp3""# } else { ":" };
    script(
        dir,
        "yt-dlp",
        &format!(
            r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; shift; fi
  shift
done
{touch}
echo '{json}'"#
        ),
    )
}

fn config_with(tools: &TempDir) -> Config {
    let mut config = Config::default();
    config.app.temp_dir = Some(tools.path().join("work"));
    config
}

fn pipeline(config: Config, stt: MockStt) -> GistPipeline {
    GistPipeline::with_transcriber(config, Arc::new(stt))
}

#[tokio::test]
async fn generates_gist_and_keeps_audio() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = fake_ytdlp(
        tools.path(),
        r#"{"id": "632067", "title": "  港島交通意外  ", "timestamp": 1705312800, "extractor": "generic"}"#,
        true,
    )
    .to_string_lossy()
    .into_owned();

    let report = pipeline(config, MockStt::new()).generate(URL, false).await.unwrap();

    assert_eq!(report.title, "港島交通意外");
    assert_eq!(report.publish_time, "2024-01-15 18:00");
    assert_eq!(
        report.gist_text,
        format!("Now：港島交通意外\n[2024-01-15 18:00]\n\n{CONTENT_PLACEHOLDER}\n\n{URL}\n\nEnds")
    );
    assert_eq!(report.mp3_name, "港島交通意外.mp3");
    assert!(report.warnings.is_empty());
    assert!(report.workdir.path().starts_with(tools.path().join("work")));

    let audio = report.audio().await.unwrap();
    assert_eq!(audio.filename, "港島交通意外.mp3");
    assert_eq!(audio.bytes, b"ID3fake");
}

#[tokio::test]
async fn missing_mp3_reports_output_missing() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = fake_ytdlp(tools.path(), r#"{"id": "632067"}"#, false)
        .to_string_lossy()
        .into_owned();

    let err = pipeline(config, MockStt::new()).generate(URL, false).await.unwrap_err();

    assert!(matches!(err, GistError::OutputMissing { .. }));
    assert!(err.classified().contains("ffmpeg"));
}

#[tokio::test]
async fn ytdlp_failure_is_classified() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = script(
        tools.path(),
        "yt-dlp",
        r#"echo "ERROR: Unsupported URL: $URL_ARG" >&2
exit 1"#,
    )
    .to_string_lossy()
    .into_owned();

    let err = pipeline(config, MockStt::new()).generate(URL, false).await.unwrap_err();
    assert_eq!(err.kind(), "UnsupportedUrl");
}

#[tokio::test]
async fn missing_ytdlp_is_tool_not_found() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = tools.path().join("nope").to_string_lossy().into_owned();

    let err = pipeline(config, MockStt::new()).generate(URL, false).await.unwrap_err();
    assert_eq!(err.kind(), "ToolNotFound");
}

#[tokio::test]
async fn transcript_fills_gist_body() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = fake_ytdlp(tools.path(), r#"{"title": "T", "upload_date": "20240115"}"#, true)
        .to_string_lossy()
        .into_owned();

    let mut stt = MockStt::new();
    stt.expect_transcribe()
        .withf(|path: &Path| path.extension().is_some_and(|e| e == "mp3"))
        .times(1)
        .returning(|_| Ok("  今日天氣好  ".to_string()));

    let report = pipeline(config, stt).generate(URL, true).await.unwrap();
    assert_eq!(report.transcript, "  今日天氣好  ");
    assert_eq!(report.gist_text, format!("Now：T\n[2024-01-15]\n\n今日天氣好\n\n{URL}\n\nEnds"));
}

#[tokio::test]
async fn transcription_failure_is_a_warning() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = fake_ytdlp(tools.path(), r#"{"title": ""}"#, true)
        .to_string_lossy()
        .into_owned();

    let mut stt = MockStt::new();
    stt.expect_transcribe()
        .returning(|_| Err(GistError::TranscriptionUnavailable("not installed".into())));

    let report = pipeline(config, stt).generate(URL, true).await.unwrap();
    assert_eq!(report.title, UNTITLED);
    assert_eq!(report.publish_time, "—");
    assert!(report.gist_text.contains(CONTENT_PLACEHOLDER));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("TranscriptionUnavailable"));
}

#[tokio::test]
async fn manifest_audio_is_named_after_news_id() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    let args_log = tools.path().join("ffmpeg-args");
    config.transcode.ffmpeg_path = script(
        tools.path(),
        "ffmpeg",
        &format!(
            r#"echo "$@" > "{}"
for last; do :; done
printf 'MP3' > "$last""#,
            args_log.display()
        ),
    )
    .to_string_lossy()
    .into_owned();

    let audio = pipeline(config, MockStt::new()).manifest_audio(URL).await.unwrap();
    assert_eq!(audio.filename, "now_632067.mp3");
    assert_eq!(audio.bytes, b"MP3");

    let args = fs_err::read_to_string(&args_log).unwrap();
    assert!(args.contains("-i https://news-videos.now.com/nownews/632067/hls/632067.m3u8 -vn -acodec libmp3lame -b:a 128k"));

    // scratch directory is gone once the audio is in memory
    let leftovers: Vec<_> = fs_err::read_dir(tools.path().join("work")).unwrap().collect();
    assert!(leftovers.is_empty());

    let out = tempfile::tempdir().unwrap();
    let saved = audio.save_into(out.path()).await.unwrap();
    assert_eq!(saved, out.path().join("now_632067.mp3"));
}

#[tokio::test]
async fn ffmpeg_failure_is_classified() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.transcode.ffmpeg_path = script(tools.path(), "ffmpeg", "exit 3").to_string_lossy().into_owned();

    let err = pipeline(config, MockStt::new()).manifest_audio(URL).await.unwrap_err();
    assert!(matches!(err, GistError::Transcode { status: Some(3) }));
}

#[tokio::test]
async fn ffmpeg_is_killed_after_timeout() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.transcode.ffmpeg_path = script(tools.path(), "ffmpeg", "sleep 30").to_string_lossy().into_owned();

    let started = std::time::Instant::now();
    let err = pipeline(config, MockStt::new())
        .with_transcode_timeout(Duration::from_secs(1))
        .manifest_audio(URL)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "Timeout");
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[tokio::test]
async fn session_keeps_audio_until_cleared() {
    let tools = tempfile::tempdir().unwrap();
    let mut config = config_with(&tools);
    config.extraction.yt_dlp_path = fake_ytdlp(tools.path(), r#"{"title": "a/b"}"#, true)
        .to_string_lossy()
        .into_owned();
    let pipeline = pipeline(config, MockStt::new());

    let mut session = Session::new();
    session.record_report(pipeline.generate(URL, false).await.unwrap());
    let workdir = session.workdir().unwrap().to_path_buf();

    let audio = session.audio().await.unwrap().unwrap();
    assert_eq!(audio.filename, "a_b.mp3");

    session.clear_results();
    assert!(!workdir.exists());
    assert!(session.text(SessionKey::GistText).is_none());
    assert!(session.audio().await.unwrap().is_none());
}
