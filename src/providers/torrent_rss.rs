use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Provider, ProviderError, ProviderKind, RssResults, SeasonResults};
use crate::clients::{FeedClient, FeedItem};
use crate::domain::{EpisodeKey, EpisodeRef};
use crate::models::{Episode, ParsedRelease, ProperRelease, ResultKind, SearchResult, SeasonSlot, Show};
use crate::parser::NameParser;
use crate::services::library::ShowLibrary;
use crate::services::scene::SceneNames;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentRssConfig {
    pub name: String,

    /// The feed of recent releases.
    pub url: String,

    /// Search feed url with a `{query}` placeholder.
    #[serde(default)]
    pub search_url: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum minutes between two fetches of the recent feed.
    #[serde(default = "default_refresh_minutes")]
    pub min_refresh_minutes: u64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_refresh_minutes() -> u64 {
    15
}

struct FeedCache {
    fetched_at: Instant,
    items: Vec<FeedItem>,
}

/// A torrent site exposing its releases as RSS.
pub struct TorrentRssProvider {
    config: TorrentRssConfig,
    client: FeedClient,
    scene: Arc<SceneNames>,
    cache: Mutex<Option<FeedCache>>,
}

impl TorrentRssProvider {
    #[must_use]
    pub fn new(config: TorrentRssConfig, scene: Arc<SceneNames>) -> Self {
        Self::with_client(config, scene, FeedClient::new())
    }

    #[must_use]
    pub fn with_client(config: TorrentRssConfig, scene: Arc<SceneNames>, client: FeedClient) -> Self {
        Self {
            config,
            client,
            scene,
            cache: Mutex::new(None),
        }
    }

    fn provider_error(&self, error: anyhow::Error) -> ProviderError {
        let status = error
            .downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status);

        match status {
            Some(s) if s == reqwest::StatusCode::UNAUTHORIZED || s == reqwest::StatusCode::FORBIDDEN => {
                ProviderError::Auth {
                    provider: self.config.name.clone(),
                    message: format!("feed returned {s}, check the feed url or passkey"),
                }
            }
            _ => ProviderError::Transient(error.context(format!("{} feed request failed", self.config.name))),
        }
    }

    /// The recent feed, refetched at most every `min_refresh_minutes`.
    async fn feed_items(&self) -> Result<Vec<FeedItem>, ProviderError> {
        let mut cache = self.cache.lock().await;
        let min_age = Duration::from_secs(self.config.min_refresh_minutes * 60);

        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < min_age
        {
            debug!(provider = %self.config.name, items = cached.items.len(), "Using cached feed");
            return Ok(cached.items.clone());
        }

        let items = self
            .client
            .fetch_feed(&self.config.url)
            .await
            .map_err(|e| self.provider_error(e))?;

        info!(provider = %self.config.name, items = items.len(), "Refreshed feed cache");

        *cache = Some(FeedCache {
            fetched_at: Instant::now(),
            items: items.clone(),
        });
        Ok(items)
    }

    async fn search_items(&self, query: &str) -> Result<Vec<FeedItem>, ProviderError> {
        let Some(template) = &self.config.search_url else {
            return Ok(Vec::new());
        };

        let url = template.replace("{query}", &urlencoding::encode(query));
        debug!(provider = %self.config.name, url = %url, "Searching feed");

        self.client
            .fetch_feed(&url)
            .await
            .map_err(|e| self.provider_error(e))
    }

    fn result(&self, show: &Arc<Show>, item: &FeedItem) -> SearchResult {
        SearchResult::new(
            show.clone(),
            &item.title,
            &item.url,
            &self.config.name,
            ResultKind::Torrent,
        )
    }

    /// Items naming exactly `episode` of `show`.
    fn match_episode(&self, show: &Arc<Show>, episode: &Episode, items: &[FeedItem]) -> Vec<SearchResult> {
        items
            .iter()
            .filter_map(|item| {
                let parsed = parse(&item.title)?;

                let matches = if show.air_by_date {
                    parsed.air_date.is_some() && parsed.air_date == episode.air_date
                } else {
                    parsed.effective_season() == episode.season
                        && parsed.episodes.contains(&episode.episode)
                };
                if !matches {
                    debug!(release = %item.title, episode = %episode.key(), "Result is for another episode, skipping it");
                    return None;
                }

                debug!(release = %item.title, url = %item.url, "Found result");
                Some(self.result(show, item).with_episodes(vec![episode.key()]))
            })
            .collect()
    }

    /// Files each item under the season slot it fills.
    async fn classify_season(&self, show: &Arc<Show>, season: u32, items: &[FeedItem]) -> SeasonResults {
        let mut results = SeasonResults::new();

        for item in items {
            let Some(parsed) = parse(&item.title) else {
                continue;
            };

            let keys: Vec<EpisodeKey> = if show.air_by_date {
                let Some(date) = parsed.air_date else {
                    debug!(release = %item.title, "Expected an air-by-date release, skipping it");
                    continue;
                };
                match show.episode_by_air_date(date).await {
                    Some(ep) if ep.season == season => vec![ep.key()],
                    _ => {
                        debug!(release = %item.title, date = %date, "No episode of this season aired then, skipping it");
                        continue;
                    }
                }
            } else {
                if parsed.effective_season() != season {
                    debug!(release = %item.title, season, "Result is not for this season, ignoring it");
                    continue;
                }
                parsed
                    .episodes
                    .iter()
                    .map(|e| EpisodeKey::new(season, *e))
                    .collect()
            };

            let slot = match keys.as_slice() {
                [] => SeasonSlot::WholeSeason,
                [key] => SeasonSlot::Episode(key.episode),
                _ => SeasonSlot::MultiEpisode,
            };
            debug!(release = %item.title, slot = ?slot, "Classified season result");

            results
                .entry(slot)
                .or_default()
                .push(self.result(show, item).with_episodes(keys));
        }

        results
    }
}

fn parse(title: &str) -> Option<ParsedRelease> {
    match NameParser::release().parse(title) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(release = %title, error = %e, "Unable to parse release name");
            None
        }
    }
}

/// Keeps the first item for each url; the feed and search results overlap.
fn dedupe_by_url(items: &mut Vec<FeedItem>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.url.clone()));
}

fn is_proper_name(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.contains(".proper.") || lower.contains(".repack.")
}

#[async_trait]
impl Provider for TorrentRssProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Torrent
    }

    fn is_active(&self) -> bool {
        self.config.enabled
    }

    async fn find_episode(
        &self,
        show: &Arc<Show>,
        episode: &Episode,
        manual: bool,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        info!(provider = %self.config.name, show = %show.name, episode = %episode.key(), "Searching for episode");

        let cached = self.match_episode(show, episode, &self.feed_items().await?);
        if !cached.is_empty() || !manual {
            return Ok(cached);
        }

        let mut items = Vec::new();
        for query in self.scene.episode_search_strings(show, episode).await {
            items.extend(self.search_items(&query).await?);
        }
        Ok(self.match_episode(show, episode, &items))
    }

    async fn find_season_results(
        &self,
        show: &Arc<Show>,
        season: u32,
    ) -> Result<SeasonResults, ProviderError> {
        info!(provider = %self.config.name, show = %show.name, season, "Searching for season");

        let mut items = self.feed_items().await?;
        for query in self.scene.season_search_strings(show, season).await {
            items.extend(self.search_items(&query).await?);
        }
        dedupe_by_url(&mut items);

        Ok(self.classify_season(show, season, &items).await)
    }

    async fn search_rss(&self, library: &ShowLibrary) -> Result<RssResults, ProviderError> {
        let mut results = RssResults::new();

        for item in self.feed_items().await? {
            let Some(parsed) = parse(&item.title) else {
                continue;
            };
            let Some(show) = parsed
                .series_name
                .as_deref()
                .and_then(|series| library.find_by_series_name(series))
            else {
                debug!(release = %item.title, "Not one of our shows, ignoring it");
                continue;
            };

            // Multi-episode releases are filed under their first episode.
            let key = if show.air_by_date {
                match parsed.air_date {
                    Some(date) => show.episode_by_air_date(date).await.map(|ep| ep.key()),
                    None => None,
                }
            } else {
                parsed
                    .episodes
                    .first()
                    .map(|e| EpisodeKey::new(parsed.effective_season(), *e))
            };
            let Some(key) = key else {
                continue;
            };
            if show.episode(key).await.is_none() {
                debug!(release = %item.title, episode = %key, "Episode is not in the library, ignoring it");
                continue;
            }

            let result = self.result(&show, &item).with_episodes(vec![key]);
            results
                .entry(EpisodeRef::new(show.id, key))
                .or_default()
                .push(result);
        }

        Ok(results)
    }

    async fn find_propers(&self, since: DateTime<Utc>) -> Result<Vec<ProperRelease>, ProviderError> {
        let now = Utc::now();

        Ok(self
            .feed_items()
            .await?
            .into_iter()
            .filter(|item| is_proper_name(&item.title))
            .map(|item| ProperRelease {
                date: item.published.unwrap_or(now),
                name: item.title,
                url: item.url,
                provider: self.config.name.clone(),
                kind: ResultKind::Torrent,
            })
            .filter(|proper| proper.date >= since)
            .collect())
    }

    async fn fetch_result(&self, result: &SearchResult) -> Result<Vec<u8>, ProviderError> {
        if result.url.starts_with("magnet:") {
            return Err(ProviderError::unsupported(&self.config.name, "downloading magnet links"));
        }

        self.client
            .fetch_bytes(&result.url)
            .await
            .map_err(|e| self.provider_error(e))
    }
}
