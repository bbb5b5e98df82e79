use super::definition::Quality;
use super::status::{CompositeStatus, EpisodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The two quality sets a show is configured with.
///
/// `any` holds qualities worth an initial download, `best` holds qualities worth
/// replacing an existing download with. The library file may also give a preset
/// name (`"hd720p"`) or the packed integer form instead of the two sets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolicyRepr")]
pub struct QualityPolicy {
    pub any: BTreeSet<Quality>,

    pub best: BTreeSet<Quality>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Preset(String),
    Packed(u32),
    Sets {
        #[serde(default)]
        any: BTreeSet<Quality>,
        #[serde(default)]
        best: BTreeSet<Quality>,
    },
}

impl TryFrom<PolicyRepr> for QualityPolicy {
    type Error = String;

    fn try_from(repr: PolicyRepr) -> Result<Self, Self::Error> {
        match repr {
            PolicyRepr::Preset(name) => {
                Self::preset(&name).ok_or_else(|| format!("unknown quality preset '{name}'"))
            }
            PolicyRepr::Packed(value) => Ok(Self::from_combined(value)),
            PolicyRepr::Sets { any, best } => Ok(Self { any, best }),
        }
    }
}

impl QualityPolicy {
    pub fn new(
        any: impl IntoIterator<Item = Quality>,
        best: impl IntoIterator<Item = Quality>,
    ) -> Self {
        Self {
            any: any.into_iter().collect(),
            best: best.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn sd() -> Self {
        Self::new([Quality::SdTv, Quality::SdDvd], [])
    }

    #[must_use]
    pub fn hd() -> Self {
        Self::new(
            [
                Quality::HdTv,
                Quality::FullHdTv,
                Quality::HdWebDl,
                Quality::FullHdWebDl,
                Quality::HdBluRay,
                Quality::FullHdBluRay,
            ],
            [],
        )
    }

    #[must_use]
    pub fn hd720p() -> Self {
        Self::new([Quality::HdTv, Quality::HdWebDl, Quality::HdBluRay], [])
    }

    #[must_use]
    pub fn hd1080p() -> Self {
        Self::new(
            [
                Quality::FullHdTv,
                Quality::FullHdWebDl,
                Quality::FullHdBluRay,
            ],
            [],
        )
    }

    #[must_use]
    pub fn any_quality() -> Self {
        Self::new(
            [
                Quality::SdTv,
                Quality::SdDvd,
                Quality::HdTv,
                Quality::FullHdTv,
                Quality::HdWebDl,
                Quality::FullHdWebDl,
                Quality::HdBluRay,
                Quality::FullHdBluRay,
                Quality::Unknown,
            ],
            [],
        )
    }

    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sd" => Some(Self::sd()),
            "hd" => Some(Self::hd()),
            "hd720p" => Some(Self::hd720p()),
            "hd1080p" => Some(Self::hd1080p()),
            "any" => Some(Self::any_quality()),
            _ => None,
        }
    }

    /// Unpacks the integer form: `any` in the low half, `best` in the high half.
    #[must_use]
    pub fn from_combined(value: u32) -> Self {
        let any = value & 0xFFFF;
        let best = value >> 16;
        let pick = |mask: u32| {
            super::QUALITIES
                .iter()
                .copied()
                .filter(|q| q.bits() != 0 && mask & q.bits() == q.bits())
                .collect::<BTreeSet<_>>()
        };
        Self {
            any: pick(any),
            best: pick(best),
        }
    }

    #[must_use]
    pub fn allows(&self, quality: Quality) -> bool {
        self.any.contains(&quality) || self.best.contains(&quality)
    }

    #[must_use]
    pub fn max_any(&self) -> Option<Quality> {
        self.any.iter().next_back().copied()
    }

    #[must_use]
    pub fn max_best(&self) -> Option<Quality> {
        self.best.iter().next_back().copied()
    }

    /// Whether a result at `quality` is good enough that no further provider
    /// needs to be asked.
    #[must_use]
    pub fn is_final(&self, quality: Quality) -> bool {
        let max_any = self.max_any();
        let max_best = self.max_best();

        if let Some(best) = max_best {
            if quality < best {
                return false;
            }
        }

        if max_any == Some(quality) {
            return true;
        }

        if max_best == Some(quality) {
            return !max_any.is_some_and(|any| quality < any);
        }

        false
    }

    /// Decides whether an episode whose stored status is `current` should be
    /// fetched at `quality`. `None` means the episode is not known.
    #[must_use]
    pub fn decide(
        &self,
        current: Option<CompositeStatus>,
        quality: Quality,
        manual: bool,
    ) -> DownloadDecision {
        if !self.allows(quality) {
            return DownloadDecision::Reject(RejectReason::QualityNotAllowed);
        }

        let Some(current) = current else {
            return DownloadDecision::Reject(RejectReason::EpisodeNotFound);
        };

        // Plain stages carry no quality, so compare the raw value first.
        let plain = EpisodeStatus::from_code(current.raw());
        if matches!(
            plain,
            Some(EpisodeStatus::Skipped | EpisodeStatus::Ignored | EpisodeStatus::Archived)
        ) && !manual
        {
            return DownloadDecision::Reject(RejectReason::NotWanted);
        }

        if matches!(
            plain,
            Some(EpisodeStatus::Wanted | EpisodeStatus::Unaired | EpisodeStatus::Skipped)
        ) {
            return DownloadDecision::Accept;
        }

        if manual {
            return DownloadDecision::Accept;
        }

        let (status, current_quality) = current.split();
        if status.is_obtained() && self.best.contains(&quality) && quality > current_quality {
            return DownloadDecision::Upgrade(UpgradeReason::BetterQuality);
        }

        DownloadDecision::Reject(RejectReason::NoImprovement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadDecision {
    Accept,

    Upgrade(UpgradeReason),

    Reject(RejectReason),
}

impl DownloadDecision {
    #[must_use]
    pub const fn should_download(&self) -> bool {
        matches!(self, Self::Accept | Self::Upgrade(_))
    }
}

impl std::fmt::Display for DownloadDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Upgrade(reason) => write!(f, "upgrade: {reason}"),
            Self::Reject(reason) => write!(f, "reject: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeReason {
    BetterQuality,
}

impl std::fmt::Display for UpgradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BetterQuality => write!(f, "better quality available"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    QualityNotAllowed,
    EpisodeNotFound,
    NotWanted,
    NoImprovement,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QualityNotAllowed => write!(f, "quality not allowed for show"),
            Self::EpisodeNotFound => write!(f, "episode not found"),
            Self::NotWanted => write!(f, "episode is skipped, ignored or archived"),
            Self::NoImprovement => write!(f, "no quality improvement"),
        }
    }
}
