use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Structured identity recovered from a free-text release name.
///
/// A release is addressed either by `air_date` or by `season` (with a possibly
/// empty `episodes` list for season packs). `season == None` with episodes
/// present means the name carried no season marker at all.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedRelease {
    pub original_name: String,

    pub series_name: Option<String>,

    pub season: Option<u32>,

    pub episodes: Vec<u32>,

    pub air_date: Option<NaiveDate>,

    pub extra_info: Option<String>,

    pub release_group: Option<String>,
}

impl ParsedRelease {
    #[must_use]
    pub fn new(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_air_by_date(&self) -> bool {
        self.season.is_none() && self.episodes.is_empty() && self.air_date.is_some()
    }

    #[must_use]
    pub fn is_season_pack(&self) -> bool {
        self.season.is_some() && self.episodes.is_empty()
    }

    /// Season used when a name omits it; single-season shows are season 1.
    #[must_use]
    pub fn effective_season(&self) -> u32 {
        self.season.unwrap_or(1)
    }
}

impl std::fmt::Display for ParsedRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(series) = &self.series_name {
            write!(f, "{series} - ")?;
        }
        if let Some(season) = self.season {
            write!(f, "S{season:02}")?;
        }
        for episode in &self.episodes {
            write!(f, "E{episode:02}")?;
        }
        if let Some(date) = self.air_date {
            write!(f, "{date}")?;
        }
        if let Some(extra) = &self.extra_info {
            write!(f, " - {extra}")?;
        }
        if let Some(group) = &self.release_group {
            write!(f, " ({group})")?;
        }
        Ok(())
    }
}
