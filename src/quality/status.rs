use super::definition::{QUALITIES, Quality};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of an episode, independent of quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Unknown,
    Unaired,
    Snatched,
    Wanted,
    Downloaded,
    Skipped,
    Archived,
    Ignored,
    SnatchedProper,
}

impl EpisodeStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::Unaired => 1,
            Self::Snatched => 2,
            Self::Wanted => 3,
            Self::Downloaded => 4,
            Self::Skipped => 5,
            Self::Archived => 6,
            Self::Ignored => 7,
            Self::SnatchedProper => 9,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unknown),
            1 => Some(Self::Unaired),
            2 => Some(Self::Snatched),
            3 => Some(Self::Wanted),
            4 => Some(Self::Downloaded),
            5 => Some(Self::Skipped),
            6 => Some(Self::Archived),
            7 => Some(Self::Ignored),
            9 => Some(Self::SnatchedProper),
            _ => None,
        }
    }

    /// Stages where a file is on its way or already on disk.
    #[must_use]
    pub const fn is_obtained(self) -> bool {
        matches!(
            self,
            Self::Snatched | Self::SnatchedProper | Self::Downloaded
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Unaired => "Unaired",
            Self::Snatched => "Snatched",
            Self::Wanted => "Wanted",
            Self::Downloaded => "Downloaded",
            Self::Skipped => "Skipped",
            Self::Archived => "Archived",
            Self::Ignored => "Ignored",
            Self::SnatchedProper => "Snatched (Proper)",
        }
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An episode status packed together with a quality (`status + 100 * bits`).
///
/// The packed value is what gets stored; always go through [`CompositeStatus::split`]
/// before comparing either half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeStatus(i32);

impl CompositeStatus {
    #[must_use]
    pub fn new(status: EpisodeStatus, quality: Quality) -> Self {
        let bits = i32::try_from(quality.bits()).unwrap_or(0);
        Self(status.code() + 100 * bits)
    }

    #[must_use]
    pub const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn split(self) -> (EpisodeStatus, Quality) {
        if self.0 == EpisodeStatus::Unknown.code() {
            return (EpisodeStatus::Unknown, Quality::Unknown);
        }

        let mut by_bits: Vec<Quality> = QUALITIES.to_vec();
        by_bits.sort_by_key(|q| std::cmp::Reverse(q.bits()));

        for quality in by_bits {
            let packed = i32::try_from(quality.bits()).unwrap_or(0) * 100;
            if self.0 > packed {
                let status =
                    EpisodeStatus::from_code(self.0 - packed).unwrap_or(EpisodeStatus::Unknown);
                return (status, quality);
            }
        }

        (
            EpisodeStatus::from_code(self.0).unwrap_or(EpisodeStatus::Unknown),
            Quality::None,
        )
    }

    #[must_use]
    pub fn status(self) -> EpisodeStatus {
        self.split().0
    }

    #[must_use]
    pub fn quality(self) -> Quality {
        self.split().1
    }
}

impl From<EpisodeStatus> for CompositeStatus {
    fn from(status: EpisodeStatus) -> Self {
        Self::new(status, Quality::None)
    }
}

impl std::fmt::Display for CompositeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (status, quality) = self.split();
        if quality == Quality::None {
            write!(f, "{status}")
        } else {
            write!(f, "{status} ({quality})")
        }
    }
}
