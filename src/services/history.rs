use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::{EpisodeRef, ShowId};
use crate::quality::Quality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Snatched,
    /// Snatched as a stand-in while a better quality is still wanted.
    PreSnatched,
    SnatchedProper,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Snatched => "snatched",
            Self::PreSnatched => "pre-snatched",
            Self::SnatchedProper => "snatched proper",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,

    pub show_id: ShowId,

    pub season: u32,

    pub episode: u32,

    pub quality: Quality,

    /// Release name that was snatched.
    pub resource: String,

    pub provider: String,

    pub date: DateTime<Utc>,
}

impl HistoryEntry {
    #[must_use]
    pub const fn episode_ref(&self) -> EpisodeRef {
        EpisodeRef::new(
            self.show_id,
            crate::domain::EpisodeKey::new(self.season, self.episode),
        )
    }
}

/// Append-only snatch history, kept as JSON lines when backed by a file.
#[derive(Debug, Default)]
pub struct History {
    path: Option<PathBuf>,
    entries: RwLock<Vec<HistoryEntry>>,
}

impl History {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a history file, reading the entries already in it.
    pub async fn open(path: &Path) -> Result<Self> {
        let mut entries = Vec::new();

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<HistoryEntry>(line) {
                        Ok(entry) => entries.push(entry),
                        Err(e) => warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "Skipping malformed history line"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read history {}", path.display()));
            }
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries: RwLock::new(entries),
        })
    }

    pub async fn record(&self, new_entries: Vec<HistoryEntry>) -> Result<()> {
        if new_entries.is_empty() {
            return Ok(());
        }

        if let Some(path) = &self.path {
            let mut lines = String::new();
            for entry in &new_entries {
                lines.push_str(&serde_json::to_string(entry)?);
                lines.push('\n');
            }

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("Failed to open history {}", path.display()))?;
            file.write_all(lines.as_bytes()).await?;
            file.flush().await?;
        }

        for entry in &new_entries {
            debug!(
                action = %entry.action,
                show_id = %entry.show_id,
                season = entry.season,
                episode = entry.episode,
                resource = %entry.resource,
                "Recorded history"
            );
        }
        self.entries.write().await.extend(new_entries);
        Ok(())
    }

    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.clone()
    }

    /// Snatch entries for one episode recorded at or after `since`.
    pub async fn snatches_since(
        &self,
        episode: EpisodeRef,
        since: DateTime<Utc>,
    ) -> Vec<HistoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.episode_ref() == episode && e.date >= since)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EpisodeKey;
    use chrono::Duration;

    fn entry(episode: u32, resource: &str, date: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            action: HistoryAction::Snatched,
            show_id: ShowId::new(9),
            season: 1,
            episode,
            quality: Quality::HdTv,
            resource: resource.to_string(),
            provider: "feed".to_string(),
            date,
        }
    }

    #[tokio::test]
    async fn test_snatches_since() {
        let history = History::in_memory();
        let now = Utc::now();
        history
            .record(vec![
                entry(1, "old", now - Duration::days(40)),
                entry(1, "recent", now - Duration::days(2)),
                entry(2, "other", now),
            ])
            .await
            .unwrap();

        let found = history
            .snatches_since(
                EpisodeRef::new(ShowId::new(9), EpisodeKey::new(1, 1)),
                now - Duration::days(30),
            )
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].resource, "recent");
    }

    #[tokio::test]
    async fn test_json_lines_persist() {
        let path = std::env::temp_dir().join(format!("snatcharr-history-{}.jsonl", uuid::Uuid::new_v4()));
        let now = Utc::now();

        let history = History::open(&path).await.unwrap();
        history.record(vec![entry(1, "first", now)]).await.unwrap();
        history.record(vec![entry(2, "second", now)]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains(r#""action":"snatched""#));

        let reopened = History::open(&path).await.unwrap();
        let entries = reopened.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].resource, "second");

        let _ = std::fs::remove_file(path);
    }
}
