use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{Duration, Local, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::history::{History, HistoryAction, HistoryEntry};
use super::library::ShowLibrary;
use crate::clients::{QBitClient, SabClient, SabPriority};
use crate::domain::events::SearchEvent;
use crate::models::{ResultKind, SearchResult};
use crate::providers::ProviderRegistry;
use crate::quality::{CompositeStatus, EpisodeStatus};

/// A mechanism that hands a chosen release to something that downloads it.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, result: &SearchResult) -> Result<()>;
}

/// Drops `.nzb` and `.torrent` files into a watched directory.
pub struct Blackhole {
    dir: PathBuf,
    providers: ProviderRegistry,
}

impl Blackhole {
    #[must_use]
    pub const fn new(dir: PathBuf, providers: ProviderRegistry) -> Self {
        Self { dir, providers }
    }
}

#[async_trait]
impl DownloadClient for Blackhole {
    fn name(&self) -> &str {
        "blackhole"
    }

    async fn send(&self, result: &SearchResult) -> Result<()> {
        let data = match &result.kind {
            ResultKind::NzbData { payload } => payload.clone().into_bytes(),
            ResultKind::Nzb | ResultKind::Torrent => {
                let Some(provider) = self.providers.get(&result.provider) else {
                    bail!("Unknown provider {} for {}", result.provider, result.name);
                };
                provider
                    .fetch_result(result)
                    .await
                    .with_context(|| format!("Failed to download {} from {}", result.name, result.provider))?
            }
        };

        if data.is_empty() {
            bail!("{} returned an empty file for {}", result.provider, result.name);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(result.file_name());

        info!(path = %path.display(), "Saving result to blackhole");
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

pub struct Sabnzbd {
    client: SabClient,
}

impl Sabnzbd {
    #[must_use]
    pub const fn new(client: SabClient) -> Self {
        Self { client }
    }
}

/// Releases for episodes that aired within the last week are queued first.
async fn sab_priority(result: &SearchResult) -> SabPriority {
    let today = Local::now().date_naive();
    for key in &result.episodes {
        let aired = result.show.episode(*key).await.and_then(|ep| ep.air_date);
        if aired.is_some_and(|date| today - date <= Duration::days(7)) {
            return SabPriority::High;
        }
    }
    SabPriority::Normal
}

#[async_trait]
impl DownloadClient for Sabnzbd {
    fn name(&self) -> &str {
        "sabnzbd"
    }

    async fn send(&self, result: &SearchResult) -> Result<()> {
        let priority = sab_priority(result).await;
        match &result.kind {
            ResultKind::Nzb => self.client.add_url(&result.url, &result.name, priority).await,
            ResultKind::NzbData { payload } => {
                self.client
                    .add_file(&result.name, payload.clone().into_bytes(), priority)
                    .await
            }
            ResultKind::Torrent => bail!("SABnzbd cannot download torrent {}", result.name),
        }
    }
}

pub struct QBittorrent {
    client: QBitClient,
}

impl QBittorrent {
    #[must_use]
    pub const fn new(client: QBitClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DownloadClient for QBittorrent {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn send(&self, result: &SearchResult) -> Result<()> {
        if result.kind != ResultKind::Torrent {
            bail!("qBittorrent cannot download NZB {}", result.name);
        }
        self.client.add_torrent_url(&result.url, Some(&result.name)).await
    }
}

#[derive(Debug, Error)]
pub enum SnatchError {
    #[error("no download method configured for {kind} results")]
    NoClient { kind: &'static str },

    #[error("{client} failed to take {release}: {cause:#}")]
    Client {
        client: String,
        release: String,
        cause: anyhow::Error,
    },
}

/// Sends chosen results to a download client and records the outcome.
pub struct SnatchExecutor {
    nzb: Option<Arc<dyn DownloadClient>>,
    torrent: Option<Arc<dyn DownloadClient>>,
    history: Arc<History>,
    library: Arc<ShowLibrary>,
    events: Option<broadcast::Sender<SearchEvent>>,
}

impl SnatchExecutor {
    #[must_use]
    pub fn new(
        nzb: Option<Arc<dyn DownloadClient>>,
        torrent: Option<Arc<dyn DownloadClient>>,
        history: Arc<History>,
        library: Arc<ShowLibrary>,
    ) -> Self {
        Self {
            nzb,
            torrent,
            history,
            library,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: broadcast::Sender<SearchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    async fn send(&self, result: &SearchResult) -> Result<(), SnatchError> {
        let (client, kind) = if result.kind.is_nzb() {
            (self.nzb.as_ref(), "nzb")
        } else {
            (self.torrent.as_ref(), "torrent")
        };
        let Some(client) = client else {
            return Err(SnatchError::NoClient { kind });
        };

        debug!(client = %client.name(), release = %result.name, "Sending result to download client");
        client.send(result).await.map_err(|cause| SnatchError::Client {
            client: client.name().to_string(),
            release: result.name.clone(),
            cause,
        })
    }

    /// Downloads `result` and moves its episodes to `status`.
    ///
    /// Nothing is recorded unless the download client accepted the result.
    pub async fn snatch(&self, result: &SearchResult, status: EpisodeStatus) -> bool {
        if let Err(e) = self.send(result).await {
            error!(release = %result.name, error = %e, "Snatch failed");
            return false;
        }

        let action = if status == EpisodeStatus::SnatchedProper {
            HistoryAction::SnatchedProper
        } else if result.predownloaded {
            HistoryAction::PreSnatched
        } else {
            HistoryAction::Snatched
        };
        let now = Utc::now();
        let entries = result
            .episodes
            .iter()
            .map(|key| HistoryEntry {
                action,
                show_id: result.show.id,
                season: key.season,
                episode: key.episode,
                quality: result.quality,
                resource: result.name.clone(),
                provider: result.provider.clone(),
                date: now,
            })
            .collect();
        if let Err(e) = self.history.record(entries).await {
            warn!(release = %result.name, error = %e, "Failed to record snatch history");
        }

        {
            let mut episodes = result.show.lock_episodes().await;
            for key in &result.episodes {
                match episodes.get_mut(key) {
                    Some(episode) => episode.status = CompositeStatus::new(status, result.quality),
                    None => warn!(show = %result.show.name, episode = %key, "Snatched episode is not in the library"),
                }
            }
        }
        if let Err(e) = self.library.save().await {
            warn!(error = %e, "Failed to save show library after snatch");
        }

        info!(
            event = "snatched",
            release = %result.name,
            provider = %result.provider,
            quality = %result.quality,
            status = %status,
            "Episode snatched"
        );

        if let Some(events) = &self.events {
            let _ = events.send(SearchEvent::Snatched {
                show_id: result.show.id,
                show_name: result.show.name.clone(),
                release: result.name.clone(),
                provider: result.provider.clone(),
                quality: result.quality,
                episodes: result.episodes.clone(),
                proper: status == EpisodeStatus::SnatchedProper,
            });
        }

        true
    }
}
