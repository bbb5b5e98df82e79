use tracing::debug;

use crate::models::SearchResult;
use crate::quality::{Quality, QualityPolicy};

fn is_proper(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("proper") || lower.contains("repack")
}

fn is_internal(name: &str) -> bool {
    name.to_lowercase().contains("internal")
}

/// Whether `candidate` should replace `best` when both are for the same episodes.
///
/// Higher known quality always wins. On an exact quality tie a proper or
/// repack beats a non-proper, and otherwise a non-internal release beats an
/// internal one.
#[must_use]
pub fn beats(candidate: &SearchResult, best: &SearchResult) -> bool {
    if candidate.quality > best.quality && candidate.quality != Quality::Unknown {
        return true;
    }
    if candidate.quality != best.quality {
        return false;
    }

    match (is_proper(&candidate.name), is_proper(&best.name)) {
        (true, false) => true,
        (false, true) => false,
        _ => is_internal(&best.name) && !is_internal(&candidate.name),
    }
}

/// Picks the best of `results`, scanning left to right.
///
/// With `allowed` set, results whose quality is in neither of its sets are
/// skipped.
#[must_use]
pub fn pick_best_result<'a, I>(results: I, allowed: Option<&QualityPolicy>) -> Option<SearchResult>
where
    I: IntoIterator<Item = &'a SearchResult>,
{
    let mut best: Option<&SearchResult> = None;

    for result in results {
        if allowed.is_some_and(|policy| !policy.allows(result.quality)) {
            debug!(
                release = %result.name,
                quality = %result.quality,
                "Quality not wanted, rejecting result"
            );
            continue;
        }

        match best {
            Some(current) if !beats(result, current) => {}
            _ => best = Some(result),
        }
    }

    match best {
        Some(result) => {
            debug!(release = %result.name, quality = %result.quality, "Picked best result");
            Some(result.clone())
        }
        None => {
            debug!("No result picked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpisodeKey, ShowId};
    use crate::models::{ResultKind, Show, ShowRecord};
    use std::sync::Arc;

    fn show() -> Arc<Show> {
        Arc::new(Show::new(ShowRecord {
            id: ShowId::new(1),
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

    fn result(name: &str) -> SearchResult {
        SearchResult::new(show(), name, format!("http://example.invalid/{name}"), "test", ResultKind::Nzb)
            .with_episodes(vec![EpisodeKey::new(5, 7)])
    }

    fn winner(names: &[&str]) -> Option<String> {
        let results: Vec<_> = names.iter().map(|n| result(n)).collect();
        pick_best_result(&results, None).map(|r| r.name)
    }

    #[test]
    fn test_empty_input() {
        assert!(pick_best_result(&Vec::<SearchResult>::new(), None).is_none());
    }

    #[test]
    fn test_bluray_beats_hdtv() {
        let bluray = "Show.Name.S05E07.720p.BluRay.X264-REWARD";
        let hdtv = "Show.Name.S05E07.720p.X264-REWARD";
        assert_eq!(result(bluray).quality, Quality::HdBluRay);
        assert_eq!(result(hdtv).quality, Quality::HdTv);

        assert_eq!(winner(&[bluray, hdtv]).as_deref(), Some(bluray));
        assert_eq!(winner(&[hdtv, bluray]).as_deref(), Some(bluray));
    }

    #[test]
    fn test_quality_order_independent_of_permutation() {
        let names = [
            "Show.Name.S05E07.HDTV.XviD-GRP",
            "Show.Name.S05E07.1080p.BluRay.x264-GRP",
            "Show.Name.S05E07.720p.HDTV.x264-GRP",
            "Show.Name.S05E07.720p.WEB-DL.DD5.1.H.264-GRP",
        ];
        let expected = Some(names[1].to_string());

        for rotation in 0..names.len() {
            let mut order = names.to_vec();
            order.rotate_left(rotation);
            assert_eq!(winner(&order), expected);
            order.reverse();
            assert_eq!(winner(&order), expected);
        }
    }

    #[test]
    fn test_proper_wins_tie_in_either_order() {
        let plain = "Show.Name.S05E07.720p.HDTV.x264-GRP";
        let proper = "Show.Name.S05E07.PROPER.720p.HDTV.x264-GRP";
        assert_eq!(winner(&[plain, proper]).as_deref(), Some(proper));
        assert_eq!(winner(&[proper, plain]).as_deref(), Some(proper));

        let repack = "Show.Name.S05E07.REPACK.720p.HDTV.x264-GRP";
        assert_eq!(winner(&[repack, plain]).as_deref(), Some(repack));
    }

    #[test]
    fn test_proper_dominates_internal() {
        let proper_internal = "Show.Name.S05E07.PROPER.iNTERNAL.720p.HDTV.x264-GRP";
        let plain = "Show.Name.S05E07.720p.HDTV.x264-GRP";
        assert_eq!(winner(&[proper_internal, plain]).as_deref(), Some(proper_internal));
        assert_eq!(winner(&[plain, proper_internal]).as_deref(), Some(proper_internal));
    }

    #[test]
    fn test_non_internal_wins_tie() {
        let internal = "Show.Name.S05E07.iNTERNAL.720p.HDTV.x264-GRP";
        let plain = "Show.Name.S05E07.720p.HDTV.x264-GRP";
        assert_eq!(winner(&[internal, plain]).as_deref(), Some(plain));
        assert_eq!(winner(&[plain, internal]).as_deref(), Some(plain));
    }

    #[test]
    fn test_tie_breaks_never_cross_quality_gap() {
        let proper_sd = "Show.Name.S05E07.PROPER.HDTV.XviD-GRP";
        let hd = "Show.Name.S05E07.720p.HDTV.x264-GRP";
        assert_eq!(winner(&[hd, proper_sd]).as_deref(), Some(hd));
    }

    #[test]
    fn test_unknown_never_replaces() {
        let sd = "Show.Name.S05E07.HDTV.XviD-GRP";
        let unknown = "Show.Name.S05E07.mystery-GRP";
        assert_eq!(result(unknown).quality, Quality::Unknown);
        assert_eq!(winner(&[sd, unknown]).as_deref(), Some(sd));
        assert_eq!(winner(&[unknown]).as_deref(), Some(unknown));
    }

    #[test]
    fn test_quality_filter() {
        let results = vec![
            result("Show.Name.S05E07.1080p.BluRay.x264-GRP"),
            result("Show.Name.S05E07.720p.HDTV.x264-GRP"),
        ];
        let only_hdtv = QualityPolicy::new([Quality::HdTv], Vec::<Quality>::new());
        let best = pick_best_result(&results, Some(&only_hdtv));
        assert_eq!(best.map(|r| r.quality), Some(Quality::HdTv));
    }
}
