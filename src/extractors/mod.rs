use serde::{Deserialize, Deserializer, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

pub mod hls;
pub mod ytdlp;

pub use hls::HlsTranscoder;
pub use ytdlp::YtDlpExtractor;

use crate::{GistError, GistResult};

/// The subset of yt-dlp's info JSON this tool reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub uploader: Option<String>,

    /// Unix seconds, possibly fractional
    #[serde(default)]
    pub timestamp: Option<f64>,

    #[serde(default)]
    pub release_timestamp: Option<f64>,

    /// `YYYYMMDD`
    #[serde(default)]
    pub upload_date: Option<String>,

    #[serde(default)]
    pub webpage_url: Option<String>,

    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub extractor: Option<String>,

    /// The info JSON exactly as yt-dlp printed it
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl MediaMetadata {
    /// Parse the last JSON object printed by yt-dlp; earlier lines may be progress noise
    pub fn from_ytdlp_stdout(stdout: &str) -> GistResult<Self> {
        let Some(line) = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
        else {
            return Ok(Self::default());
        };

        let raw: serde_json::Value = serde_json::from_str(line)?;
        let mut meta: Self = serde_json::from_value(raw.clone())?;
        meta.raw = raw;
        Ok(meta)
    }

    /// Title with surrounding whitespace removed, if non-empty
    pub fn clean_title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// First file in `dir` whose extension matches `extension`, ignoring case.
///
/// Entries are sorted by name so repeated scans agree; more than one match is
/// logged because the producing tool is expected to leave exactly one.
pub fn find_first_with_extension(dir: &Path, extension: &str) -> GistResult<Option<PathBuf>> {
    let mut matches: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();

    matches.sort();

    if matches.len() > 1 {
        tracing::warn!(
            "{} .{} files in {}, using {}",
            matches.len(),
            extension,
            dir.display(),
            matches[0].display()
        );
    }

    Ok(matches.into_iter().next())
}

/// Run `command` to completion, killing it if it outlives `timeout`
pub(crate) async fn run_with_timeout(
    mut command: Command,
    tool: &str,
    timeout: Duration,
) -> GistResult<Output> {
    command.kill_on_drop(true);

    let child = command.spawn().map_err(|e| spawn_error(tool, e))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => {
            tracing::error!("{} timed out after {}s, killing", tool, timeout.as_secs());
            Err(GistError::Timeout {
                tool: tool.to_string(),
                timeout,
            })
        }
    }
}

pub(crate) fn spawn_error(tool: &str, e: std::io::Error) -> GistError {
    if e.kind() == ErrorKind::NotFound {
        GistError::ToolNotFound { tool: tool.to_string() }
    } else {
        GistError::Io(e)
    }
}

/// Availability of one external tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub purpose: &'static str,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

/// Ask `program` for its version; `None` when it cannot be run
pub async fn tool_version(program: &str, version_arg: &str) -> Option<String> {
    let output = Command::new(program)
        .arg(version_arg)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
        .or_else(|| Some("unknown version".to_string()))
}
