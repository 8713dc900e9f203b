//! Per-session result store for the interactive prompt.
//!
//! Results of the last run live here so later actions (saving the audio,
//! showing metadata) can reach them. The working directory of the last run is
//! kept too and removed when it is replaced or the results are cleared.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

use crate::extractors::MediaMetadata;
use crate::pipeline::{load_audio, ExtractedAudio, GistReport};
use crate::utils::FALLBACK_FILENAME;
use crate::{GistError, GistResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    GistText,
    LastInfo,
    LastMp3Name,
    LastError,
    Transcript,
    Workdir,
}

impl SessionKey {
    /// Keys removed by [`Session::clear_results`]
    pub const RESULTS: [SessionKey; 6] = [
        SessionKey::GistText,
        SessionKey::LastInfo,
        SessionKey::LastMp3Name,
        SessionKey::LastError,
        SessionKey::Transcript,
        SessionKey::Workdir,
    ];
}

#[derive(Debug)]
pub enum SessionValue {
    Text(String),
    Metadata(Box<MediaMetadata>),
    Workdir(TempDir),
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    values: HashMap<SessionKey, SessionValue>,
}

impl Session {
    pub fn new() -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            values: HashMap::new(),
        };
        tracing::debug!("Session {} started", session.id);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn contains(&self, key: SessionKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn insert(&mut self, key: SessionKey, value: SessionValue) -> Option<SessionValue> {
        self.values.insert(key, value)
    }

    pub fn remove(&mut self, key: SessionKey) -> Option<SessionValue> {
        self.values.remove(&key)
    }

    pub fn text(&self, key: SessionKey) -> Option<&str> {
        match self.values.get(&key) {
            Some(SessionValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<&MediaMetadata> {
        match self.values.get(&SessionKey::LastInfo) {
            Some(SessionValue::Metadata(meta)) => Some(meta.as_ref()),
            _ => None,
        }
    }

    pub fn workdir(&self) -> Option<&Path> {
        match self.values.get(&SessionKey::Workdir) {
            Some(SessionValue::Workdir(dir)) => Some(dir.path()),
            _ => None,
        }
    }

    /// Store a successful run. A previous working directory is dropped and deleted.
    pub fn record_report(&mut self, report: GistReport) {
        self.remove(SessionKey::LastError);
        self.insert(SessionKey::GistText, SessionValue::Text(report.gist_text));
        self.insert(SessionKey::Transcript, SessionValue::Text(report.transcript));
        self.insert(SessionKey::LastMp3Name, SessionValue::Text(report.mp3_name));
        self.insert(SessionKey::LastInfo, SessionValue::Metadata(Box::new(report.metadata)));
        if let Some(SessionValue::Workdir(old)) =
            self.insert(SessionKey::Workdir, SessionValue::Workdir(report.workdir))
        {
            tracing::debug!("Releasing previous workdir {}", old.path().display());
        }
    }

    /// Store a failed run; results of earlier runs no longer apply
    pub fn record_error(&mut self, error: &GistError) {
        for key in SessionKey::RESULTS {
            self.remove(key);
        }
        self.insert(SessionKey::LastError, SessionValue::Text(error.classified()));
    }

    /// Remove all results, deleting the retained working directory
    pub fn clear_results(&mut self) {
        for key in SessionKey::RESULTS {
            self.remove(key);
        }
        tracing::debug!("Session {} cleared", self.id);
    }

    /// Load the mp3 of the last run under its display name
    pub async fn audio(&self) -> GistResult<Option<ExtractedAudio>> {
        let Some(workdir) = self.workdir() else {
            return Ok(None);
        };
        if !workdir.is_dir() {
            return Ok(None);
        }
        let name = self
            .text(SessionKey::LastMp3Name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{FALLBACK_FILENAME}.mp3"));

        load_audio(workdir, &name).await.map(Some)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
