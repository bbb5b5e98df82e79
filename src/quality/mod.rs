pub mod definition;
pub mod profile;
pub mod status;

pub use definition::{QUALITIES, Quality};
pub use profile::{DownloadDecision, QualityPolicy, RejectReason, UpgradeReason};
pub use status::{CompositeStatus, EpisodeStatus};

use regex::Regex;
use std::sync::OnceLock;

struct QualityPatterns {
    exact: Vec<(Quality, Regex)>,
    resolution: Regex,
    sd_source: Regex,
    hr_pdtv: Regex,
    web: Regex,
    sd_codec: Regex,
    dvd_rip: Regex,
    dvd: Regex,
    hddvd: Regex,
    xvid_divx: Regex,
    p720: Regex,
    p1080: Regex,
    p1080_any: Regex,
    h264: Regex,
    x264: Regex,
    hdtv: Regex,
    hd_source: Regex,
    raw_resolution: Regex,
    mpeg2: Regex,
    hdtv_1080: Regex,
    itunes: Regex,
    bluray: Regex,
}

fn build(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("Invalid regex pattern defined in code")
}

fn patterns() -> &'static QualityPatterns {
    static PATTERNS: OnceLock<QualityPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let exact = QUALITIES
            .iter()
            .rev()
            .filter(|q| q.is_known())
            .map(|q| {
                let words: Vec<String> = q.as_str().split(' ').map(regex::escape).collect();
                (*q, build(&format!(r"\W{}\W", words.join(r"\W"))))
            })
            .collect();

        QualityPatterns {
            exact,
            resolution: build(r"(720|1080)[pi]"),
            sd_source: build(r"(pdtv|hdtv|dsr|tvrip).(xvid|x264)"),
            hr_pdtv: build(r"hr.ws.pdtv.x264"),
            web: build(r"web.dl|webrip"),
            sd_codec: build(r"xvid|x264|h.?264"),
            dvd_rip: build(r"(dvdrip|bdrip)(.ws)?.(xvid|divx|x264)"),
            dvd: build(r"dvd"),
            hddvd: build(r"hddvd"),
            xvid_divx: build(r"xvid|divx"),
            p720: build(r"720p"),
            p1080: build(r"1080p"),
            p1080_any: build(r"1080[pi]"),
            h264: build(r"x264|h.?264"),
            x264: build(r"x264"),
            hdtv: build(r"hdtv"),
            hd_source: build(r"bluray|hddvd|web.dl|webrip|itunes"),
            raw_resolution: build(r"720p|1080i"),
            mpeg2: build(r"mpeg-?2"),
            hdtv_1080: build(r"1080[pi].hdtv"),
            itunes: build(r"itunes"),
            bluray: build(r"bluray|hddvd"),
        }
    })
}

/// Classifies a release or file name into a [`Quality`].
///
/// Exact quality strings (as written by our own renamer) win over the token
/// heuristics; anything without a recognizable token is `Unknown`.
#[must_use]
pub fn name_quality(name: &str) -> Quality {
    let name = base_name(name);
    let p = patterns();

    if let Some((quality, _)) = p.exact.iter().find(|(_, re)| re.is_match(name)) {
        return *quality;
    }

    let has = |re: &Regex| re.is_match(name);
    let no_resolution = !has(&p.resolution);

    if has(&p.sd_source) && no_resolution && !has(&p.hr_pdtv) {
        Quality::SdTv
    } else if has(&p.web) && has(&p.sd_codec) && no_resolution {
        Quality::SdTv
    } else if (has(&p.dvd_rip) || (has(&p.dvd) && !has(&p.hddvd))) && no_resolution {
        Quality::SdDvd
    } else if has(&p.xvid_divx) && no_resolution {
        Quality::SdTv
    } else if (has(&p.p720) && has(&p.h264) && !has(&p.hd_source))
        || (has(&p.p720) && has(&p.hdtv) && has(&p.x264))
        || (has(&p.hr_pdtv) && !has(&p.p1080_any))
    {
        Quality::HdTv
    } else if (has(&p.raw_resolution) && has(&p.hdtv) && has(&p.mpeg2))
        || (has(&p.hdtv_1080) && has(&p.h264))
    {
        Quality::RawHdTv
    } else if has(&p.p1080) && has(&p.hdtv) && has(&p.x264) {
        Quality::FullHdTv
    } else if has(&p.p720) && (has(&p.web) || (has(&p.itunes) && has(&p.h264))) {
        Quality::HdWebDl
    } else if has(&p.p1080) && (has(&p.web) || (has(&p.itunes) && has(&p.h264))) {
        Quality::FullHdWebDl
    } else if has(&p.p720) && has(&p.bluray) && has(&p.x264) {
        Quality::HdBluRay
    } else if has(&p.p1080) && has(&p.bluray) && has(&p.x264) {
        Quality::FullHdBluRay
    } else {
        Quality::Unknown
    }
}

/// Guesses a quality from the container extension alone.
#[must_use]
pub fn assume_quality(name: &str) -> Quality {
    let lower = name.to_lowercase();
    if lower.ends_with(".avi") || lower.ends_with(".mp4") {
        Quality::SdTv
    } else if lower.ends_with(".mkv") {
        Quality::HdTv
    } else if lower.ends_with(".ts") {
        Quality::RawHdTv
    } else {
        Quality::Unknown
    }
}

/// Name-based quality with an extension fallback, for on-disk file names.
#[must_use]
pub fn quality_from_file_name(name: &str) -> Quality {
    match name_quality(name) {
        Quality::Unknown => assume_quality(name),
        quality => quality,
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sd_releases() {
        for name in [
            "Test.Show.S01E02.PDTV.XViD-GROUP",
            "Test.Show.S01E02.HDTV.x264-GROUP",
            "Test.Show.S01E02.DSR.XViD-GROUP",
            "Test.Show.S01E02.TVRip.x264-GROUP",
            "Test.Show.S01E02.WEBRip.XViD-GROUP",
            "Test.Show.S01E02.WEB-DL.AAC2.0.H.264-GROUP",
            "Test.Show.S01E02_WEB-DL_H_264-GROUP",
            "Test.Show.S01E02.XviD-GROUP",
        ] {
            assert_eq!(name_quality(name), Quality::SdTv, "{name}");
        }
    }

    #[test]
    fn test_sd_dvd_releases() {
        for name in [
            "Test.Show.S01E02.DVDRiP.XViD-GROUP",
            "Test.Show.S01E02.DVDRip.WS.x264-GROUP",
            "Test.Show.S01E02.BDRIP.WS.DiVX-GROUP",
            "Test.Show.S01E02.DVD.MPEG2-GROUP",
        ] {
            assert_eq!(name_quality(name), Quality::SdDvd, "{name}");
        }
    }

    #[test]
    fn test_hd_tv_releases() {
        assert_eq!(
            name_quality("Test.Show.S01E02.720p.HDTV.x264-GROUP"),
            Quality::HdTv
        );
        assert_eq!(
            name_quality("Test.Show.S01E02.HR.WS.PDTV.x264-GROUP"),
            Quality::HdTv
        );
        assert_eq!(
            name_quality("Show.Name.S05E07.720p.X264-REWARD"),
            Quality::HdTv
        );
    }

    #[test]
    fn test_raw_and_full_hd_tv() {
        assert_eq!(
            name_quality("Test.Show.S01E02.720p.HDTV.DD5.1.MPEG2-GROUP"),
            Quality::RawHdTv
        );
        assert_eq!(
            name_quality("Test Show - S01E02 - 1080i HDTV MPA1.0 H.264 - GROUP"),
            Quality::RawHdTv
        );
        assert_eq!(
            name_quality("Test.Show.S01E02.1080p.HDTV.x264-GROUP"),
            Quality::FullHdTv
        );
    }

    #[test]
    fn test_web_dl_releases() {
        assert_eq!(
            name_quality("Test.Show.S01E02.720p.WEB-DL.AAC2.0.H.264-GROUP"),
            Quality::HdWebDl
        );
        assert_eq!(
            name_quality("Test.Show.S01E02.720p.iTunes.Rip.H264.AAC-GROUP"),
            Quality::HdWebDl
        );
        assert_eq!(
            name_quality("Test_Show_S01E02_1080p_iTunes_H_264_AAC-GROUP"),
            Quality::FullHdWebDl
        );
        assert_eq!(
            name_quality("Test.Show.S01E02.WEBRip.1080p.H264.AAC.2.0-GROUP"),
            Quality::FullHdWebDl
        );
    }

    #[test]
    fn test_bluray_releases() {
        assert_eq!(
            name_quality("Show.Name.S05E07.720p.BluRay.X264-REWARD"),
            Quality::HdBluRay
        );
        assert_eq!(
            name_quality("Test.Show.S01E02.720p.HDDVD.x264-GROUP"),
            Quality::HdBluRay
        );
        assert_eq!(
            name_quality("Test.Show.S01E02.1080p.BluRay.x264-GROUP"),
            Quality::FullHdBluRay
        );
    }

    #[test]
    fn test_exact_quality_strings() {
        assert_eq!(
            name_quality("Test Show - S01E02 - SD DVD - GROUP"),
            Quality::SdDvd
        );
        assert_eq!(
            name_quality("Test Show - S01E02 - RawHD TV - GROUP"),
            Quality::RawHdTv
        );
        assert_eq!(
            name_quality("Test Show - S01E02 - 1080p HD TV - GROUP"),
            Quality::FullHdTv
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(name_quality("Test.Show.S01E02-SiCKBEARD"), Quality::Unknown);
        assert_eq!(
            quality_from_file_name("/tv/Test.Show.S01E02-SiCKBEARD.mkv"),
            Quality::HdTv
        );
        assert_eq!(assume_quality("episode.ts"), Quality::RawHdTv);
        assert_eq!(assume_quality("episode.nfo"), Quality::Unknown);
    }
}
