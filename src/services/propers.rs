use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::filter::ResultFilter;
use super::history::{History, HistoryAction};
use super::library::ShowLibrary;
use super::snatch::SnatchExecutor;
use crate::domain::{EpisodeKey, EpisodeRef};
use crate::models::{ProperRelease, SearchResult};
use crate::parser::NameParser;
use crate::providers::{ProviderError, ProviderRegistry};
use crate::quality::{EpisodeStatus, name_quality};

/// How far back providers are asked for propers.
const PROPER_SEARCH_DAYS: i64 = 2;

/// How recent the original snatch must be for a proper to replace it.
const HISTORY_LIMIT_DAYS: i64 = 30;

/// Name with separators flattened, used to spot the same release twice.
fn generic_name(name: &str) -> String {
    name.replace(['.', '-', '_'], " ").to_lowercase()
}

/// Finds proper/repack releases of episodes that were already fetched.
pub struct ProperFinder {
    providers: ProviderRegistry,
    library: Arc<ShowLibrary>,
    filter: Arc<ResultFilter>,
    history: Arc<History>,
}

impl ProperFinder {
    #[must_use]
    pub const fn new(
        providers: ProviderRegistry,
        library: Arc<ShowLibrary>,
        filter: Arc<ResultFilter>,
        history: Arc<History>,
    ) -> Self {
        Self {
            providers,
            library,
            filter,
            history,
        }
    }

    /// Propers from every provider, first provider wins for the same release, newest first.
    async fn proper_list(&self, since: DateTime<Utc>, cancel: &CancellationToken) -> Vec<ProperRelease> {
        let mut propers: BTreeMap<String, ProperRelease> = BTreeMap::new();

        for provider in self.providers.active() {
            if cancel.is_cancelled() {
                break;
            }

            info!(provider = %provider.name(), "Searching for new PROPER releases");
            let found = match provider.find_propers(since).await {
                Ok(found) => found,
                Err(e @ ProviderError::Unsupported { .. }) => {
                    debug!(error = %e, "Provider skipped");
                    continue;
                }
                Err(e @ ProviderError::Auth { .. }) => {
                    error!(provider = %provider.name(), error = %e, "Authentication error, skipping provider");
                    continue;
                }
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Error while searching provider for propers, skipping it");
                    debug!(provider = %provider.name(), "{e:?}");
                    continue;
                }
            };

            for proper in found {
                propers.entry(generic_name(&proper.name)).or_insert_with(|| {
                    debug!(release = %proper.name, "Found new proper");
                    proper
                });
            }
        }

        let mut list: Vec<ProperRelease> = propers.into_values().collect();
        list.sort_by(|a, b| b.date.cmp(&a.date));
        list
    }

    /// Propers worth snatching: one per episode, only for episodes already
    /// fetched at the proper's quality.
    pub async fn find_propers(&self, cancel: &CancellationToken) -> Vec<SearchResult> {
        let since = Utc::now() - Duration::days(PROPER_SEARCH_DAYS);
        let mut wanted = Vec::new();
        let mut seen: BTreeSet<EpisodeRef> = BTreeSet::new();

        for proper in self.proper_list(since, cancel).await {
            let Ok(parsed) = NameParser::release().parse(&proper.name) else {
                debug!(release = %proper.name, "Unable to parse proper name");
                continue;
            };
            if parsed.episodes.is_empty() && !parsed.is_air_by_date() {
                debug!(release = %proper.name, "Ignoring proper for a full season");
                continue;
            }

            let Some(show) = parsed
                .series_name
                .as_deref()
                .and_then(|series| self.library.find_by_series_name(series))
            else {
                continue;
            };

            if self.filter.is_bad_release(&proper.name) {
                debug!(release = %proper.name, "Proper isn't a valid scene release that we want, ignoring it");
                continue;
            }

            let key = match (parsed.air_date, parsed.episodes.first()) {
                (_, Some(episode)) => EpisodeKey::new(parsed.effective_season(), *episode),
                (Some(date), None) => match show.episode_by_air_date(date).await {
                    Some(ep) => ep.key(),
                    None => {
                        debug!(release = %proper.name, date = %date, "No episode aired on this date");
                        continue;
                    }
                },
                (None, None) => continue,
            };
            let Some(episode) = show.episode(key).await else {
                continue;
            };

            let quality = name_quality(&proper.name);
            let (status, current_quality) = episode.status.split();
            if !matches!(status, EpisodeStatus::Downloaded | EpisodeStatus::Snatched)
                || current_quality != quality
            {
                debug!(release = %proper.name, status = %status, "Episode not fetched at this quality, ignoring proper");
                continue;
            }

            let episode_ref = EpisodeRef::new(show.id, key);
            if !seen.insert(episode_ref) {
                continue;
            }

            info!(release = %proper.name, "Found a proper that we need");
            wanted.push(
                SearchResult::new(show, &proper.name, &proper.url, &proper.provider, proper.kind)
                    .with_quality(quality)
                    .with_episodes(vec![key]),
            );
        }

        wanted
    }

    /// Whether the original release of a proper's episode was snatched recently
    /// and is not this same release.
    async fn replaces_recent_snatch(&self, proper: &SearchResult) -> bool {
        let limit = Utc::now() - Duration::days(HISTORY_LIMIT_DAYS);
        let Some(episode) = proper.episode_refs().first().copied() else {
            return false;
        };

        let snatches: Vec<_> = self
            .history
            .snatches_since(episode, limit)
            .await
            .into_iter()
            .filter(|e| {
                matches!(e.action, HistoryAction::Snatched | HistoryAction::SnatchedProper)
                    && e.quality == proper.quality
            })
            .collect();

        if snatches.is_empty() {
            info!(release = %proper.name, "No original history entry for proper, not downloading it");
            return false;
        }
        if snatches
            .iter()
            .any(|e| generic_name(&e.resource) == generic_name(&proper.name))
        {
            debug!(release = %proper.name, "Proper is already in history, skipping it");
            return false;
        }
        true
    }

    /// Finds and snatches propers. Returns how many were snatched.
    pub async fn run(&self, snatcher: &SnatchExecutor, cancel: &CancellationToken) -> usize {
        let mut snatched = 0;

        for proper in self.find_propers(cancel).await {
            if cancel.is_cancelled() {
                break;
            }
            if !self.replaces_recent_snatch(&proper).await {
                continue;
            }
            if snatcher.snatch(&proper, EpisodeStatus::SnatchedProper).await {
                snatched += 1;
            }
        }

        snatched
    }
}
