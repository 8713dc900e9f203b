use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde_json::{json, Value};

use crate::extractors::MediaMetadata;

/// Shown when no publish time can be derived
pub const NO_PUBLISH_TIME: &str = "—";

/// Gist body used when there is no transcript
pub const CONTENT_PLACEHOLDER: &str =
    "（暫未加入內文；如需要自動轉文字，請啟用「語音轉文字」功能。）";

/// Gist title used when the media has none
pub const UNTITLED: &str = "（無標題）";

/// Fixed offset for `hours` east of UTC, falling back to UTC for out-of-range values
pub fn regional_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Publish time of `meta` in `offset`.
///
/// `timestamp` wins over `release_timestamp`, which wins over `upload_date`.
/// Timestamps render to the minute, upload dates to the day.
pub fn format_publish_time(meta: &MediaMetadata, offset: &FixedOffset) -> String {
    if let Some(formatted) = meta.timestamp.and_then(|ts| format_unix(ts, offset)) {
        return formatted;
    }

    if let Some(formatted) = meta.release_timestamp.and_then(|ts| format_unix(ts, offset)) {
        return formatted;
    }

    if let Some(date) = meta.upload_date.as_deref().and_then(parse_upload_date) {
        return date.format("%Y-%m-%d").to_string();
    }

    NO_PUBLISH_TIME.to_string()
}

fn format_unix(ts: f64, offset: &FixedOffset) -> Option<String> {
    if !ts.is_finite() {
        return None;
    }
    let utc = DateTime::from_timestamp(ts.trunc() as i64, 0)?;
    Some(offset.from_utc_datetime(&utc.naive_utc()).format("%Y-%m-%d %H:%M").to_string())
}

fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

/// The gist text block. Fields are inserted verbatim.
pub fn build_summary(
    media_name: &str,
    title: &str,
    publish_time: &str,
    content: &str,
    url: &str,
) -> String {
    let content = match content.trim() {
        "" => CONTENT_PLACEHOLDER,
        trimmed => trimmed,
    };

    format!("{media_name}：{title}\n[{publish_time}]\n\n{content}\n\n{url}\n\nEnds")
}

const DEBUG_FIELDS: [&str; 8] = [
    "title",
    "id",
    "uploader",
    "timestamp",
    "upload_date",
    "webpage_url",
    "duration",
    "extractor",
];

/// Selected metadata fields for the diagnostics view, as yt-dlp reported them
pub fn debug_panel(meta: &MediaMetadata) -> Value {
    let parsed = json!({
        "title": meta.title,
        "id": meta.id,
        "uploader": meta.uploader,
        "timestamp": meta.timestamp,
        "upload_date": meta.upload_date,
        "webpage_url": meta.webpage_url,
        "duration": meta.duration,
        "extractor": meta.extractor,
    });

    DEBUG_FIELDS
        .iter()
        .map(|&field| {
            let value = meta.raw.get(field).or_else(|| parsed.get(field)).cloned();
            (field.to_string(), value.unwrap_or(Value::Null))
        })
        .collect::<serde_json::Map<String, Value>>()
        .into()
}
