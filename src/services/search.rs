//! The search coordinator: asks every active provider for releases and
//! reduces what they return to the results worth snatching.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::filter::ResultFilter;
use super::library::ShowLibrary;
use super::ranker::{beats, pick_best_result};
use super::splitter::split_season_result;
use crate::domain::events::SearchEvent;
use crate::domain::{EpisodeKey, EpisodeRef};
use crate::models::{Episode, ResultKind, SearchResult, SeasonSlot, Show};
use crate::providers::{Provider, ProviderError, ProviderRegistry, SeasonResults};
use crate::quality::Quality;

pub struct SearchCoordinator {
    providers: ProviderRegistry,
    filter: Arc<ResultFilter>,
    events: Option<broadcast::Sender<SearchEvent>>,
}

impl SearchCoordinator {
    #[must_use]
    pub const fn new(providers: ProviderRegistry, filter: Arc<ResultFilter>) -> Self {
        Self {
            providers,
            filter,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: broadcast::Sender<SearchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Logs a failed provider call; the provider is skipped for this pass.
    fn provider_failed(&self, provider: &dyn Provider, error: &ProviderError) {
        match error {
            ProviderError::Auth { .. } => {
                error!(provider = %provider.name(), error = %error, "Authentication error, skipping provider");
            }
            ProviderError::Unsupported { .. } => {
                debug!(provider = %provider.name(), error = %error, "Provider skipped");
                return;
            }
            ProviderError::Transient(_) => {
                warn!(provider = %provider.name(), error = %error, "Error while searching provider, skipping it");
                debug!(provider = %provider.name(), "{error:?}");
            }
        }

        if let Some(events) = &self.events {
            let _ = events.send(SearchEvent::ProviderFailed {
                provider: provider.name().to_string(),
                message: error.to_string(),
            });
        }
    }

    fn no_providers_searched() {
        error!(
            event = "no_providers",
            "No NZB/torrent providers were searched, check the provider settings"
        );
    }

    /// Drops releases that are not TV or not for `show`.
    fn keep_good(&self, results: Vec<SearchResult>, show: &Show, season: Option<u32>) -> Vec<SearchResult> {
        results
            .into_iter()
            .filter(|r| {
                !self.filter.is_bad_release(&r.name)
                    && self.filter.is_good_result(&r.name, show, season)
            })
            .collect()
    }

    /// Drops results covering an episode that is not wanted at the result's quality.
    async fn keep_wanted(&self, results: Vec<SearchResult>, manual: bool) -> Vec<SearchResult> {
        let mut wanted = Vec::with_capacity(results.len());
        for result in results {
            if all_wanted(&result.show, &result.episodes, result.quality, manual).await {
                wanted.push(result);
            } else {
                debug!(
                    release = %result.name,
                    quality = %result.quality,
                    "Ignoring result, episode not wanted at this quality"
                );
            }
        }
        wanted
    }

    /// Best release for one episode across every active provider.
    pub async fn find_episode(
        &self,
        show: &Arc<Show>,
        episode: &Episode,
        manual: bool,
        cancel: &CancellationToken,
    ) -> Option<SearchResult> {
        info!(show = %show.name, episode = %episode.key(), manual, "Searching for episode");

        let mut found = Vec::new();
        let mut searched = false;

        for provider in self.providers.active() {
            if cancel.is_cancelled() {
                info!("Search cancelled");
                break;
            }

            let results = match provider.find_episode(show, episode, manual).await {
                Ok(results) => results,
                Err(e) => {
                    self.provider_failed(provider.as_ref(), &e);
                    continue;
                }
            };
            searched = true;

            let results = self.keep_good(results, show, Some(episode.season));
            let results = self.keep_wanted(results, manual).await;

            let done = !manual && results.iter().any(|r| show.quality.is_final(r.quality));
            debug!(
                provider = %provider.name(),
                results = results.len(),
                done,
                "Provider searched"
            );
            found.extend(results);

            if done {
                debug!(provider = %provider.name(), "Found a final-quality result, not asking further providers");
                break;
            }
        }

        if !searched {
            Self::no_providers_searched();
            return None;
        }

        pick_best_result(&found, None)
    }

    /// Scans each provider's recent feed for wanted episodes.
    ///
    /// Per episode the first provider's pick is only replaced by a later
    /// provider's pick of strictly higher quality.
    pub async fn search_for_needed_episodes(
        &self,
        library: &ShowLibrary,
        cancel: &CancellationToken,
    ) -> Vec<SearchResult> {
        info!("Searching all providers for any needed episodes");

        let mut found: BTreeMap<EpisodeRef, SearchResult> = BTreeMap::new();
        let mut searched = false;

        for provider in self.providers.active() {
            if cancel.is_cancelled() {
                info!("Feed sweep cancelled");
                break;
            }

            let provider_results = match provider.search_rss(library).await {
                Ok(results) => results,
                Err(e) => {
                    self.provider_failed(provider.as_ref(), &e);
                    continue;
                }
            };
            searched = true;

            for (episode, results) in provider_results {
                let Some(show) = library.get(episode.show) else {
                    continue;
                };
                if show.paused {
                    debug!(show = %show.name, episode = %episode.key, "Show is paused, ignoring feed items");
                    continue;
                }

                let results = self.keep_good(results, &show, Some(episode.key.season));
                let results = self.keep_wanted(results, false).await;
                let Some(best) = pick_best_result(&results, None) else {
                    continue;
                };

                if let Some(existing) = found.get(&episode)
                    && best.quality <= existing.quality
                {
                    debug!(
                        release = %best.name,
                        kept = %existing.name,
                        "Already have a result of this quality from an earlier provider"
                    );
                    continue;
                }
                found.insert(episode, best);
            }
        }

        if !searched {
            Self::no_providers_searched();
            return Vec::new();
        }

        info!(results = found.len(), "Feed sweep finished");
        found.into_values().collect()
    }

    /// Results to snatch for the wanted episodes of one season.
    pub async fn find_season(
        &self,
        show: &Arc<Show>,
        season: u32,
        cancel: &CancellationToken,
    ) -> Vec<SearchResult> {
        info!(show = %show.name, season, "Searching for needed episodes of season");

        let mut found = SeasonResults::new();
        let mut origin: BTreeMap<String, Arc<dyn Provider>> = BTreeMap::new();
        let mut searched = false;

        for provider in self.providers.active() {
            if cancel.is_cancelled() {
                info!("Season search cancelled");
                break;
            }

            let provider_results = match provider.find_season_results(show, season).await {
                Ok(results) => results,
                Err(e) => {
                    self.provider_failed(provider.as_ref(), &e);
                    continue;
                }
            };
            searched = true;
            origin.insert(provider.name().to_string(), provider.clone());

            for (slot, results) in provider_results {
                let results = self.keep_good(results, show, Some(season));
                found.entry(slot).or_default().extend(results);
            }
        }

        if !searched {
            Self::no_providers_searched();
            return Vec::new();
        }

        let season_episodes: Vec<EpisodeKey> = show
            .episodes_in_season(season)
            .await
            .iter()
            .map(Episode::key)
            .collect();

        let mut multi = found.remove(&SeasonSlot::MultiEpisode).unwrap_or_default();
        let season_packs = found.remove(&SeasonSlot::WholeSeason).unwrap_or_default();

        if let Some(pack) = pick_best_result(&season_packs, Some(&show.quality)) {
            let mut wanted = Vec::new();
            for key in &season_episodes {
                if all_wanted(show, &[*key], pack.quality, false).await {
                    wanted.push(*key);
                }
            }
            debug!(
                release = %pack.name,
                quality = %pack.quality,
                wanted = wanted.len(),
                episodes = season_episodes.len(),
                "Checked season result"
            );

            if !wanted.is_empty() && wanted.len() == season_episodes.len() {
                info!(release = %pack.name, "Every episode of the season is wanted, taking the season result");
                return vec![pack.with_episodes(season_episodes)];
            }

            if wanted.is_empty() {
                debug!(release = %pack.name, "No episode of the season is wanted at this quality, ignoring season result");
            } else {
                for result in self.break_up_season(pack, season, &wanted, &origin).await {
                    match result.episodes.as_slice() {
                        [key] => found.entry(SeasonSlot::Episode(key.episode)).or_default().push(result),
                        [] => {}
                        _ => multi.push(result),
                    }
                }
            }
        }

        // Only singles that would actually be snatched can stand in for a multi-episode result.
        let mut singles: BTreeMap<u32, Vec<SearchResult>> = BTreeMap::new();
        for (slot, results) in found {
            let SeasonSlot::Episode(episode) = slot else {
                continue;
            };
            let results = self.keep_wanted(results, false).await;
            if !results.is_empty() {
                singles.insert(episode, results);
            }
        }

        let multi = self.keep_wanted(multi, false).await;
        let mut final_results = Vec::new();
        let mut covered_by_multi: BTreeSet<EpisodeKey> = BTreeSet::new();

        for result in order_by_preference(multi) {
            let needed = result
                .episodes
                .iter()
                .any(|key| !singles.contains_key(&key.episode));
            if !needed {
                debug!(release = %result.name, "Every episode is covered by single-episode results, ignoring multi-episode result");
                continue;
            }
            if result.episodes.iter().any(|key| covered_by_multi.contains(key)) {
                debug!(release = %result.name, "Overlaps a multi-episode result already kept, ignoring it");
                continue;
            }

            for key in &result.episodes {
                covered_by_multi.insert(*key);
                if singles.remove(&key.episode).is_some() {
                    debug!(
                        release = %result.name,
                        episode = %key,
                        "Multi-episode result supersedes single-episode results"
                    );
                }
            }
            final_results.push(result);
        }

        for results in singles.into_values() {
            if let Some(best) = pick_best_result(&results, None) {
                final_results.push(best);
            }
        }

        info!(show = %show.name, season, results = final_results.len(), "Season search finished");
        final_results
    }

    /// Turns a partly wanted season result into results for the wanted episodes.
    ///
    /// NZBs are split into per-episode NZBs. A torrent cannot be split, so it
    /// becomes one multi-episode result for the wanted episodes.
    async fn break_up_season(
        &self,
        pack: SearchResult,
        season: u32,
        wanted: &[EpisodeKey],
        origin: &BTreeMap<String, Arc<dyn Provider>>,
    ) -> Vec<SearchResult> {
        if !pack.kind.is_nzb() {
            info!(release = %pack.name, "Taking season torrent as a multi-episode result for the wanted episodes");
            return vec![pack.with_episodes(wanted.to_vec())];
        }

        let payload = match &pack.kind {
            ResultKind::NzbData { payload } => payload.clone(),
            _ => {
                let Some(provider) = origin.get(&pack.provider) else {
                    error!(provider = %pack.provider, "Season result came from an unknown provider");
                    return Vec::new();
                };
                match provider.fetch_result(&pack).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(e) => {
                        self.provider_failed(provider.as_ref(), &e);
                        return Vec::new();
                    }
                }
            }
        };

        info!(release = %pack.name, "Breaking apart the season NZB");
        let split = split_season_result(&pack, &payload).await;
        let split = self.keep_good(split, &pack.show, Some(season));

        split
            .into_iter()
            .filter(|r| r.episodes.iter().all(|key| wanted.contains(key)))
            .collect()
    }
}

async fn all_wanted(show: &Show, episodes: &[EpisodeKey], quality: Quality, manual: bool) -> bool {
    for key in episodes {
        if !show
            .want_episode(key.season, key.episode, quality, manual)
            .await
            .should_download()
        {
            return false;
        }
    }
    true
}

/// Best multi-episode results first, using the same tie-breaks as the ranker.
fn order_by_preference(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut ordered = Vec::with_capacity(results.len());
    while !results.is_empty() {
        let mut best = 0;
        for (i, result) in results.iter().enumerate().skip(1) {
            if beats(result, &results[best]) {
                best = i;
            }
        }
        ordered.push(results.remove(best));
    }
    ordered
}
