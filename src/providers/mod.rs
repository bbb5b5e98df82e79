//! Search providers: the indexers and feeds releases are found on.
//!
//! Every provider implements [`Provider`]. The search coordinator asks the
//! active providers of a [`ProviderRegistry`] one after another.

pub mod torrent_rss;

pub use torrent_rss::{TorrentRssConfig, TorrentRssProvider};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::EpisodeRef;
use crate::models::{Episode, ProperRelease, SearchResult, SeasonSlot, Show};
use crate::services::library::ShowLibrary;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected our credentials; it is skipped for this pass.
    #[error("authentication failed for {provider}: {message}")]
    Auth { provider: String, message: String },

    #[error(transparent)]
    Transient(#[from] anyhow::Error),

    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: &'static str,
    },
}

impl ProviderError {
    #[must_use]
    pub fn unsupported(provider: &str, capability: &'static str) -> Self {
        Self::Unsupported {
            provider: provider.to_string(),
            capability,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Nzb,
    Torrent,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nzb => "nzb",
            Self::Torrent => "torrent",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Season search results keyed by the slot they fill.
pub type SeasonResults = BTreeMap<SeasonSlot, Vec<SearchResult>>;

/// Results of a feed sweep, grouped by the episode they are for.
pub type RssResults = BTreeMap<EpisodeRef, Vec<SearchResult>>;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn is_active(&self) -> bool {
        true
    }

    /// Candidate releases for a single episode.
    async fn find_episode(
        &self,
        show: &Arc<Show>,
        episode: &Episode,
        manual: bool,
    ) -> Result<Vec<SearchResult>, ProviderError>;

    /// Candidate releases for a whole season.
    async fn find_season_results(
        &self,
        show: &Arc<Show>,
        season: u32,
    ) -> Result<SeasonResults, ProviderError>;

    /// Recent releases from the provider's feed, mapped to tracked episodes.
    async fn search_rss(&self, library: &ShowLibrary) -> Result<RssResults, ProviderError>;

    /// Proper and repack releases published after `since`.
    async fn find_propers(&self, since: DateTime<Utc>) -> Result<Vec<ProperRelease>, ProviderError> {
        let _ = since;
        Err(ProviderError::unsupported(self.name(), "propers"))
    }

    /// Raw bytes behind a result url (an NZB or a .torrent file).
    async fn fetch_result(&self, result: &SearchResult) -> Result<Vec<u8>, ProviderError>;
}

/// Ordered providers, built once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    /// Active providers, in registration order.
    #[must_use]
    pub fn active(&self) -> Vec<Arc<dyn Provider>> {
        self.providers
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}
