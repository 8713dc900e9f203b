use chrono::FixedOffset;
use regex::Regex;
use std::sync::LazyLock;

use crate::config::Config;
use crate::extractors::{tool_version, ToolStatus};

/// Longest file stem `safe_filename` returns, in characters
pub const MAX_FILENAME_CHARS: usize = 120;

/// Used when sanitizing leaves nothing
pub const FALLBACK_FILENAME: &str = "audio";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("valid filename regex"));

/// Make a title usable as a file name on any common filesystem.
///
/// Each run of `\ / : * ? " < > |` becomes one underscore, the result is cut to
/// 120 characters and trimmed.
pub fn safe_filename(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let truncated: String = replaced.chars().take(MAX_FILENAME_CHARS).collect();
    let trimmed = truncated.trim();

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Current wall-clock time in `offset`, to the second
pub fn now_in_offset(offset: &FixedOffset) -> String {
    chrono::Utc::now()
        .with_timezone(offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Probe every external tool the configuration refers to
pub async fn check_dependencies(config: &Config) -> Vec<ToolStatus> {
    let tools = [
        (&config.extraction.yt_dlp_path, "--version", "page extraction"),
        (&config.transcode.ffmpeg_path, "-version", "audio transcoding"),
        (&config.transcription.command, "--help", "speech-to-text (optional)"),
    ];

    let mut statuses = Vec::with_capacity(tools.len());
    for (program, arg, purpose) in tools {
        statuses.push(ToolStatus {
            name: program.clone(),
            purpose,
            version: tool_version(program, arg).await,
        });
    }

    statuses
}

/// Tools that are needed for the core commands but missing
pub fn missing_required(statuses: &[ToolStatus]) -> Vec<&ToolStatus> {
    statuses
        .iter()
        .filter(|status| !status.is_available() && !status.purpose.contains("optional"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_replaces_unsafe_runs() {
        assert_eq!(safe_filename("a/b"), "a_b");
        assert_eq!(safe_filename("a//b"), "a_b");
        assert_eq!(safe_filename(r#"x\/:*?"<>|y"#), "x_y");
        assert_eq!(safe_filename("新聞：標題"), "新聞：標題");
    }

    #[test]
    fn test_safe_filename_trims_and_falls_back() {
        assert_eq!(safe_filename("  spaced  "), "spaced");
        assert_eq!(safe_filename(""), "audio");
        assert_eq!(safe_filename("   "), "audio");
        assert_eq!(safe_filename("/"), "_");
    }

    #[test]
    fn test_safe_filename_truncates_by_chars() {
        let long = "標".repeat(200);
        let name = safe_filename(&long);
        assert_eq!(name.chars().count(), 120);
    }

    #[test]
    fn test_safe_filename_properties() {
        let inputs = [
            "".to_string(),
            " ".repeat(130),
            format!("{}{}", " ".repeat(119), "x/y"),
            "?".repeat(500),
            "abc<def>ghi|".repeat(30),
        ];
        for input in &inputs {
            let name = safe_filename(input);
            assert!(!name.is_empty());
            assert!(name.chars().count() <= MAX_FILENAME_CHARS);
            assert!(!name.contains(['\\', '/', ':', '*', '?', '"', '<', '>', '|']));
        }
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_now_in_offset_shape() {
        let now = now_in_offset(&FixedOffset::east_opt(8 * 3600).unwrap());
        assert_eq!(now.len(), "2024-01-15 18:00:00".len());
    }

    #[test]
    fn test_missing_required_skips_optional() {
        let statuses = vec![
            ToolStatus { name: "yt-dlp".into(), purpose: "page extraction", version: None },
            ToolStatus { name: "whisper".into(), purpose: "speech-to-text (optional)", version: None },
            ToolStatus { name: "ffmpeg".into(), purpose: "audio transcoding", version: Some("7".into()) },
        ];
        let missing = missing_required(&statuses);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "yt-dlp");
    }
}
