use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::show::Show;
use crate::domain::{EpisodeKey, EpisodeRef};
use crate::quality::{Quality, name_quality};

/// How a result is fetched once it is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultKind {
    /// An NZB reachable at the result url.
    Nzb,
    /// An NZB carried inline, produced by splitting a season pack.
    NzbData { payload: String },
    Torrent,
}

impl ResultKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nzb => "nzb",
            Self::NzbData { .. } => "nzbdata",
            Self::Torrent => "torrent",
        }
    }

    #[must_use]
    pub const fn is_nzb(&self) -> bool {
        matches!(self, Self::Nzb | Self::NzbData { .. })
    }
}

/// A candidate release for one or more episodes of a show.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub name: String,

    pub url: String,

    pub provider: String,

    pub quality: Quality,

    pub show: Arc<Show>,

    /// Covered episodes; empty for an unsplit season pack.
    pub episodes: Vec<EpisodeKey>,

    pub kind: ResultKind,

    /// Set when the result stands in for a better quality that is still wanted.
    pub predownloaded: bool,
}

impl SearchResult {
    /// Builds a result, classifying its quality from the name.
    #[must_use]
    pub fn new(
        show: Arc<Show>,
        name: impl Into<String>,
        url: impl Into<String>,
        provider: impl Into<String>,
        kind: ResultKind,
    ) -> Self {
        let name = name.into();
        Self {
            quality: name_quality(&name),
            name,
            url: url.into(),
            provider: provider.into(),
            show,
            episodes: Vec::new(),
            kind,
            predownloaded: false,
        }
    }

    #[must_use]
    pub fn with_episodes(mut self, episodes: Vec<EpisodeKey>) -> Self {
        self.episodes = episodes;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn is_multi_episode(&self) -> bool {
        self.episodes.len() > 1
    }

    #[must_use]
    pub fn episode_refs(&self) -> Vec<EpisodeRef> {
        self.episodes
            .iter()
            .map(|key| EpisodeRef::new(self.show.id, *key))
            .collect()
    }

    /// File name to use when dropping this result into a blackhole directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        let extension = if self.kind.is_nzb() { "nzb" } else { "torrent" };
        let safe: String = self
            .name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();
        format!("{safe}.{extension}")
    }
}

/// Slot a season search result is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeasonSlot {
    Episode(u32),
    MultiEpisode,
    WholeSeason,
}

/// A proper/repack release seen on a provider.
#[derive(Debug, Clone)]
pub struct ProperRelease {
    pub name: String,

    pub url: String,

    pub provider: String,

    pub date: DateTime<Utc>,

    pub kind: ResultKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShowId;
    use crate::models::show::ShowRecord;
    use crate::quality::QualityPolicy;

    fn show() -> Arc<Show> {
        Arc::new(Show::new(ShowRecord {
            id: ShowId::new(7),
            name: "Show Name".to_string(),
            tvrage_name: None,
            start_year: None,
            quality: QualityPolicy::hd(),
            air_by_date: false,
            season_folders: true,
            paused: false,
            episodes: Vec::new(),
        }))
    }

    #[test]
    fn test_new_classifies_quality() {
        let result = SearchResult::new(
            show(),
            "Show.Name.S05E07.720p.BluRay.X264-REWARD",
            "http://example.invalid/1.nzb",
            "indexer",
            ResultKind::Nzb,
        );
        assert_eq!(result.quality, Quality::HdBluRay);
        assert!(!result.is_multi_episode());
    }

    #[test]
    fn test_file_name_is_path_safe() {
        let result = SearchResult::new(
            show(),
            "Show: Name/S01E01",
            "magnet:?xt=urn:btih:abc",
            "feed",
            ResultKind::Torrent,
        )
        .with_episodes(vec![EpisodeKey::new(1, 1), EpisodeKey::new(1, 2)]);

        assert_eq!(result.file_name(), "Show_ Name_S01E01.torrent");
        assert!(result.is_multi_episode());
        assert_eq!(result.episode_refs().len(), 2);
    }
}
