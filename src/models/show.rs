use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::debug;

use crate::domain::{EpisodeKey, ShowId};
use crate::quality::{CompositeStatus, DownloadDecision, EpisodeStatus, Quality, QualityPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub season: u32,

    pub episode: u32,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub air_date: Option<NaiveDate>,

    pub status: CompositeStatus,
}

impl Episode {
    #[must_use]
    pub fn new(season: u32, episode: u32, status: EpisodeStatus) -> Self {
        Self {
            season,
            episode,
            name: None,
            air_date: None,
            status: status.into(),
        }
    }

    #[must_use]
    pub const fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season, self.episode)
    }
}

/// Serializable form of a [`Show`], as stored in the library file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowRecord {
    pub id: ShowId,

    pub name: String,

    #[serde(default)]
    pub tvrage_name: Option<String>,

    #[serde(default)]
    pub start_year: Option<i32>,

    #[serde(default)]
    pub quality: QualityPolicy,

    #[serde(default)]
    pub air_by_date: bool,

    #[serde(default = "default_true")]
    pub season_folders: bool,

    #[serde(default)]
    pub paused: bool,

    #[serde(default)]
    pub episodes: Vec<Episode>,
}

const fn default_true() -> bool {
    true
}

/// A tracked show.
///
/// Show settings are immutable once loaded. Episode state sits behind the
/// show's own lock, which serializes status transitions for that show.
#[derive(Debug)]
pub struct Show {
    pub id: ShowId,
    pub name: String,
    pub tvrage_name: Option<String>,
    pub start_year: Option<i32>,
    pub quality: QualityPolicy,
    pub air_by_date: bool,
    pub season_folders: bool,
    pub paused: bool,
    episodes: RwLock<BTreeMap<EpisodeKey, Episode>>,
}

impl Show {
    #[must_use]
    pub fn new(record: ShowRecord) -> Self {
        let episodes = record
            .episodes
            .into_iter()
            .map(|ep| (ep.key(), ep))
            .collect();

        Self {
            id: record.id,
            name: record.name,
            tvrage_name: record.tvrage_name,
            start_year: record.start_year,
            quality: record.quality,
            air_by_date: record.air_by_date,
            season_folders: record.season_folders,
            paused: record.paused,
            episodes: RwLock::new(episodes),
        }
    }

    pub async fn snapshot(&self) -> ShowRecord {
        let episodes = self.episodes.read().await.values().cloned().collect();
        ShowRecord {
            id: self.id,
            name: self.name.clone(),
            tvrage_name: self.tvrage_name.clone(),
            start_year: self.start_year,
            quality: self.quality.clone(),
            air_by_date: self.air_by_date,
            season_folders: self.season_folders,
            paused: self.paused,
            episodes,
        }
    }

    pub async fn episode(&self, key: EpisodeKey) -> Option<Episode> {
        self.episodes.read().await.get(&key).cloned()
    }

    pub async fn episodes_in_season(&self, season: u32) -> Vec<Episode> {
        self.episodes
            .read()
            .await
            .range(EpisodeKey::new(season, 0)..=EpisodeKey::new(season, u32::MAX))
            .map(|(_, ep)| ep.clone())
            .collect()
    }

    pub async fn seasons(&self) -> Vec<u32> {
        let mut seasons: Vec<u32> = self
            .episodes
            .read()
            .await
            .keys()
            .map(|k| k.season)
            .collect();
        seasons.dedup();
        seasons
    }

    pub async fn episode_by_air_date(&self, date: NaiveDate) -> Option<Episode> {
        self.episodes
            .read()
            .await
            .values()
            .find(|ep| ep.air_date == Some(date))
            .cloned()
    }

    /// Exclusive access to this show's episodes for a status transition.
    pub async fn lock_episodes(&self) -> RwLockWriteGuard<'_, BTreeMap<EpisodeKey, Episode>> {
        self.episodes.write().await
    }

    /// Whether an episode should be fetched at `quality`.
    pub async fn want_episode(
        &self,
        season: u32,
        episode: u32,
        quality: Quality,
        manual: bool,
    ) -> DownloadDecision {
        let current = self
            .episode(EpisodeKey::new(season, episode))
            .await
            .map(|ep| ep.status);
        let decision = self.quality.decide(current, quality, manual);

        debug!(
            show = %self.name,
            season,
            episode,
            quality = %quality,
            manual,
            decision = %decision,
            "Checked whether episode is wanted"
        );

        decision
    }
}
