use serde::{Deserialize, Serialize};

/// Coarse release quality, ordered from worst to best.
///
/// `None` and `Unknown` sit below every real quality so that a plain `>`
/// comparison never prefers an unclassified release.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    None,
    Unknown,
    SdTv,
    SdDvd,
    HdTv,
    RawHdTv,
    FullHdTv,
    HdWebDl,
    FullHdWebDl,
    HdBluRay,
    FullHdBluRay,
}

pub const QUALITIES: [Quality; 11] = [
    Quality::None,
    Quality::Unknown,
    Quality::SdTv,
    Quality::SdDvd,
    Quality::HdTv,
    Quality::RawHdTv,
    Quality::FullHdTv,
    Quality::HdWebDl,
    Quality::FullHdWebDl,
    Quality::HdBluRay,
    Quality::FullHdBluRay,
];

impl Quality {
    /// Bit flag used when packing qualities into composite statuses and policies.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::SdTv => 1,
            Self::SdDvd => 1 << 1,
            Self::HdTv => 1 << 2,
            Self::RawHdTv => 1 << 3,
            Self::FullHdTv => 1 << 4,
            Self::HdWebDl => 1 << 5,
            Self::FullHdWebDl => 1 << 6,
            Self::HdBluRay => 1 << 7,
            Self::FullHdBluRay => 1 << 8,
            Self::Unknown => 1 << 15,
        }
    }

    #[must_use]
    pub fn from_bits(bits: u32) -> Option<Self> {
        QUALITIES.iter().copied().find(|q| q.bits() == bits)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "N/A",
            Self::Unknown => "Unknown",
            Self::SdTv => "SD TV",
            Self::SdDvd => "SD DVD",
            Self::HdTv => "HD TV",
            Self::RawHdTv => "RawHD TV",
            Self::FullHdTv => "1080p HD TV",
            Self::HdWebDl => "720p WEB-DL",
            Self::FullHdWebDl => "1080p WEB-DL",
            Self::HdBluRay => "720p BluRay",
            Self::FullHdBluRay => "1080p BluRay",
        }
    }

    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::None | Self::Unknown)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sorts_below_real_qualities() {
        assert!(Quality::Unknown < Quality::SdTv);
        assert!(Quality::None < Quality::Unknown);
        assert!(Quality::HdTv < Quality::HdBluRay);
        assert!(Quality::HdBluRay < Quality::FullHdBluRay);
    }

    #[test]
    fn test_bits_are_unique() {
        for (i, a) in QUALITIES.iter().enumerate() {
            for b in &QUALITIES[i + 1..] {
                assert_ne!(a.bits(), b.bits(), "{a} and {b} share bits");
            }
        }
        assert_eq!(Quality::from_bits(1 << 7), Some(Quality::HdBluRay));
        assert_eq!(Quality::from_bits(3), None);
    }
}
