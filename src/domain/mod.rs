//! Domain identifiers shared by the search engine and its collaborators.
//!
//! Newtypes keep show ids, season numbers and episode numbers from being mixed up.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tracked show (the tvdb id of the series).
///
/// # Examples
///
/// ```rust
/// use snatcharr::domain::ShowId;
///
/// let id = ShowId::new(73739);
/// assert_eq!(id.value(), 73739);
/// assert_eq!(id.to_string(), "73739");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShowId(u32);

impl ShowId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ShowId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<ShowId> for u32 {
    fn from(id: ShowId) -> Self {
        id.0
    }
}

impl Serialize for ShowId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for ShowId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = u32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Season and episode number of one episode within a show.
///
/// Ordering is season first, then episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    #[must_use]
    pub const fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{:02}", self.season, self.episode)
    }
}

/// An episode of a specific show, used to key results across shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub show: ShowId,
    pub key: EpisodeKey,
}

impl EpisodeRef {
    #[must_use]
    pub const fn new(show: ShowId, key: EpisodeKey) -> Self {
        Self { show, key }
    }
}

impl fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.show, self.key)
    }
}
