//! Recognising provider links and deriving HLS manifest URLs from them.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::ProviderConfig;

/// Default base the manifest path is appended to
pub const DEFAULT_MANIFEST_HOST: &str = "https://news-videos.now.com/nownews";

/// Host fragments accepted when no config is supplied
pub const DEFAULT_HOST_FRAGMENTS: &[&str] = &["news.now.com", "now.com"];

static NEWS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"newsId=(\d+)").expect("valid newsId regex"));

/// Numeric media id captured from a provider URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used for audio fetched through the manifest
    pub fn audio_filename(&self) -> String {
        format!("now_{}.mp3", self.0)
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HLS manifest derived from a provider URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestTarget {
    pub media: MediaReference,
    pub manifest_url: String,
}

/// True when the trimmed input contains any of the default provider hosts.
///
/// Deliberately a substring test rather than URL parsing, so links pasted with
/// surrounding text or extra query parameters still pass.
pub fn is_known_provider(url: &str) -> bool {
    matches_hosts(url, DEFAULT_HOST_FRAGMENTS.iter().copied())
}

/// Same as [`is_known_provider`] against the configured host list
pub fn is_known_provider_with(url: &str, config: &ProviderConfig) -> bool {
    matches_hosts(url, config.host_fragments.iter().map(String::as_str))
}

fn matches_hosts<'a>(url: &str, mut hosts: impl Iterator<Item = &'a str>) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    hosts.any(|host| !host.is_empty() && url.contains(host))
}

/// Derive the manifest URL from the first `newsId=<digits>` in `url`
pub fn resolve(url: &str) -> Option<ManifestTarget> {
    resolve_with(url, DEFAULT_MANIFEST_HOST)
}

pub fn resolve_with(url: &str, manifest_host: &str) -> Option<ManifestTarget> {
    let id = NEWS_ID.captures(url)?.get(1)?.as_str();
    let host = manifest_host.trim_end_matches('/');

    Some(ManifestTarget {
        media: MediaReference(id.to_string()),
        manifest_url: format!("{host}/{id}/hls/{id}.m3u8"),
    })
}

/// Result of an HTTP HEAD against a manifest URL
#[derive(Debug, Clone, Serialize)]
pub struct ManifestProbe {
    pub url: String,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub error: Option<String>,
}

impl ManifestProbe {
    pub fn is_available(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }

    /// One-line status for the terminal
    pub fn summary(&self) -> String {
        match (self.status, &self.error) {
            (Some(status), _) if self.is_available() => format!(
                "{} (available, {})",
                status,
                self.content_type.as_deref().unwrap_or("no content type")
            ),
            (Some(status), _) => format!("{} (not available)", status),
            (None, Some(error)) => format!("unreachable ({})", error),
            (None, None) => "unknown".to_string(),
        }
    }
}

/// Check whether the manifest answers. Network failures are reported in the
/// probe rather than returned as errors.
pub async fn probe_manifest(url: &str, timeout: Duration) -> ManifestProbe {
    tracing::debug!("Probing manifest: {}", url);

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            return ManifestProbe {
                url: url.to_string(),
                status: None,
                content_type: None,
                error: Some(e.to_string()),
            }
        }
    };

    match client.head(url).send().await {
        Ok(response) => ManifestProbe {
            url: url.to_string(),
            status: Some(response.status().as_u16()),
            content_type: response
                .headers()
                .get("content-type")
                .and_then(|ct| ct.to_str().ok())
                .map(|s| s.to_string()),
            error: None,
        },
        Err(e) => ManifestProbe {
            url: url.to_string(),
            status: None,
            content_type: None,
            error: Some(e.to_string()),
        },
    }
}
