//! The recurring searches: the feed sweep for new episodes, the backlog
//! search for missed ones and the proper finder.

use chrono::{Duration, Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::library::ShowLibrary;
use super::propers::ProperFinder;
use super::search::SearchCoordinator;
use super::snatch::SnatchExecutor;
use crate::models::{Episode, SearchResult, Show};
use crate::quality::{CompositeStatus, EpisodeStatus};

/// Days a limited backlog search looks back.
const RECENT_BACKLOG_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub download_propers: bool,

    /// Days between two full backlog searches; limited searches run in between.
    pub backlog_frequency_days: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            download_propers: true,
            backlog_frequency_days: 7,
        }
    }
}

pub struct SearchTasks {
    coordinator: Arc<SearchCoordinator>,
    snatcher: Arc<SnatchExecutor>,
    propers: ProperFinder,
    library: Arc<ShowLibrary>,
    settings: SearchSettings,
    last_full_backlog: Mutex<Option<NaiveDate>>,
}

impl SearchTasks {
    #[must_use]
    pub fn new(
        coordinator: Arc<SearchCoordinator>,
        snatcher: Arc<SnatchExecutor>,
        propers: ProperFinder,
        library: Arc<ShowLibrary>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            coordinator,
            snatcher,
            propers,
            library,
            settings,
            last_full_backlog: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn library(&self) -> &ShowLibrary {
        &self.library
    }

    /// Searches run side by side, so an episode may have been snatched since it was found.
    async fn still_wanted(result: &SearchResult, manual: bool) -> bool {
        for key in &result.episodes {
            if !result
                .show
                .want_episode(key.season, key.episode, result.quality, manual)
                .await
                .should_download()
            {
                return false;
            }
        }
        true
    }

    async fn snatch_all(&self, results: Vec<SearchResult>, manual: bool, cancel: &CancellationToken) -> usize {
        let mut snatched = 0;
        for mut result in results {
            if cancel.is_cancelled() {
                info!("Cancelled, not snatching remaining results");
                break;
            }
            if !Self::still_wanted(&result, manual).await {
                info!(release = %result.name, "Episode was fetched by another search meanwhile, skipping result");
                continue;
            }

            // Below the best wanted quality: taken for now, still searched for later.
            result.predownloaded = result
                .show
                .quality
                .max_best()
                .is_some_and(|best| result.quality < best);

            if self.snatcher.snatch(&result, EpisodeStatus::Snatched).await {
                snatched += 1;
            }
        }
        snatched
    }

    /// Marks episodes that have aired but are still Unaired as Wanted.
    pub async fn mark_aired_episodes_wanted(&self, today: NaiveDate) -> usize {
        let mut changed = 0;

        for show in self.library.shows() {
            let mut episodes = show.lock_episodes().await;
            for episode in episodes.values_mut() {
                let unaired = EpisodeStatus::from_code(episode.status.raw()) == Some(EpisodeStatus::Unaired);
                if unaired && episode.air_date.is_some_and(|d| d < today) {
                    debug!(show = %show.name, episode = %episode.key(), "Episode has aired, marking it wanted");
                    episode.status = CompositeStatus::from(EpisodeStatus::Wanted);
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            info!(episodes = changed, "Changed aired episodes to Wanted");
            if let Err(e) = self.library.save().await {
                warn!(error = %e, "Failed to save show library");
            }
        }
        changed
    }

    /// Sweeps the provider feeds and snatches whatever is needed.
    pub async fn current_search(&self, cancel: &CancellationToken) -> usize {
        self.mark_aired_episodes_wanted(Local::now().date_naive()).await;

        info!("Beginning search for new episodes on RSS");

        let results = self
            .coordinator
            .search_for_needed_episodes(&self.library, cancel)
            .await;
        if results.is_empty() {
            info!("No needed episodes found on the RSS feeds");
            return 0;
        }

        self.snatch_all(results, false, cancel).await
    }

    /// Searches one episode directly and snatches the best result.
    pub async fn search_episode(
        &self,
        show: &Arc<Show>,
        episode: &Episode,
        manual: bool,
        cancel: &CancellationToken,
    ) -> bool {
        match self.coordinator.find_episode(show, episode, manual, cancel).await {
            Some(result) => self.snatch_all(vec![result], manual, cancel).await > 0,
            None => {
                info!(show = %show.name, episode = %episode.key(), "No result found");
                false
            }
        }
    }

    /// Searches one season and snatches the results.
    pub async fn search_season(&self, show: &Arc<Show>, season: u32, cancel: &CancellationToken) -> usize {
        let results = self.coordinator.find_season(show, season, cancel).await;
        self.snatch_all(results, false, cancel).await
    }

    /// Whether an episode of `show` still needs a download or an upgrade.
    fn needs_episode(show: &Show, episode: &Episode) -> bool {
        let highest_best = show.quality.max_best();
        let (status, quality) = episode.status.split();
        let plain = EpisodeStatus::from_code(episode.status.raw());

        plain == Some(EpisodeStatus::Wanted)
            || (matches!(status, EpisodeStatus::Downloaded | EpisodeStatus::Snatched)
                && highest_best.is_some_and(|best| quality < best))
    }

    /// Searches seasons with missing episodes.
    ///
    /// Every `backlog_frequency_days` the whole library is searched; in between
    /// only seasons with episodes that aired during the last week.
    pub async fn backlog_search(&self, cancel: &CancellationToken) -> usize {
        let today = Local::now().date_naive();
        let full = {
            let last = self.last_full_backlog.lock().await;
            last.is_none_or(|d| {
                today - d >= Duration::days(i64::from(self.settings.backlog_frequency_days))
            })
        };
        let from_date = if full {
            info!("Running full backlog search");
            None
        } else {
            info!("Running limited backlog on recently missed episodes only");
            Some(today - Duration::days(RECENT_BACKLOG_DAYS))
        };

        let mut snatched = 0;

        for show in self.library.shows() {
            if cancel.is_cancelled() {
                info!("Backlog search cancelled");
                return snatched;
            }
            if show.paused {
                continue;
            }

            if show.air_by_date {
                snatched += self.backlog_air_by_date(show, from_date, cancel).await;
                continue;
            }

            for season in show.seasons().await {
                if season == 0 || cancel.is_cancelled() {
                    continue;
                }
                let episodes = show.episodes_in_season(season).await;
                let recent = from_date.is_none_or(|from| {
                    episodes.iter().any(|ep| ep.air_date.is_some_and(|d| d > from))
                });
                if !recent {
                    continue;
                }
                if !episodes.iter().any(|ep| Self::needs_episode(show, ep)) {
                    debug!(show = %show.name, season, "Nothing in season needs to be downloaded, skipping it");
                    continue;
                }

                snatched += self.search_season(show, season, cancel).await;
            }
        }

        if full && !cancel.is_cancelled() {
            *self.last_full_backlog.lock().await = Some(today);
        }
        snatched
    }

    /// Air-by-date shows are searched episode by episode.
    async fn backlog_air_by_date(
        &self,
        show: &Arc<Show>,
        from_date: Option<NaiveDate>,
        cancel: &CancellationToken,
    ) -> usize {
        let mut snatched = 0;
        for season in show.seasons().await {
            for episode in show.episodes_in_season(season).await {
                if cancel.is_cancelled() {
                    return snatched;
                }
                let in_range = match (episode.air_date, from_date) {
                    (Some(aired), Some(from)) => aired > from,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if in_range
                    && Self::needs_episode(show, &episode)
                    && self.search_episode(show, &episode, false, cancel).await
                {
                    snatched += 1;
                }
            }
        }
        snatched
    }

    /// Looks for propers of recently fetched episodes, if enabled.
    pub async fn proper_search(&self, cancel: &CancellationToken) -> usize {
        if !self.settings.download_propers {
            debug!("Proper downloads are disabled");
            return 0;
        }
        info!("Beginning the search for new propers");
        self.propers.run(&self.snatcher, cancel).await
    }
}
