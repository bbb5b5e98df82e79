use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::scene::{SceneNames, sanitize_scene_name};
use crate::models::Show;
use crate::parser::NameParser;

/// Tokens that mark foreign, sample or otherwise unusable releases.
const RESULT_FILTERS: [&str; 7] = [
    "sub(pack|s|bed)",
    "nlsub(bed|s)?",
    "swesub(bed)?",
    "(dir|sample|nfo)fix",
    "sample",
    "(dvd)?extras",
    "dub(bed)?",
];

#[derive(Debug, Clone, Default)]
pub struct FilterSettings {
    /// Extra words that reject a release when they appear as a whole token.
    pub ignore_words: Vec<String>,
}

fn token_regex(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)(^|[\W_])(?:{word})($|[\W_])"))
        .expect("Invalid regex pattern defined in code")
}

fn builtin_filters() -> &'static [Regex] {
    static FILTERS: OnceLock<Vec<Regex>> = OnceLock::new();
    FILTERS.get_or_init(|| RESULT_FILTERS.iter().copied().map(token_regex).collect())
}

/// Rejects releases that are junk or that belong to a different show.
#[derive(Debug, Clone)]
pub struct ResultFilter {
    ignore_words: Vec<(String, Regex)>,
    scene: Arc<SceneNames>,
}

impl ResultFilter {
    #[must_use]
    pub fn new(settings: &FilterSettings, scene: Arc<SceneNames>) -> Self {
        let ignore_words = settings
            .ignore_words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(|w| (w.to_string(), token_regex(&regex::escape(w))))
            .collect();

        Self {
            ignore_words,
            scene,
        }
    }

    #[must_use]
    pub fn scene(&self) -> &SceneNames {
        &self.scene
    }

    /// Whether the tokens after the episode marker contain a denied word.
    ///
    /// Names that cannot be parsed are let through; nothing proves them bad.
    #[must_use]
    pub fn is_bad_release(&self, name: &str) -> bool {
        let Ok(parsed) = NameParser::release().parse(name) else {
            return false;
        };

        let check = match (parsed.extra_info, parsed.release_group) {
            (Some(extra), Some(group)) => format!("{extra}-{group}"),
            (Some(extra), None) => extra,
            (None, Some(group)) => group,
            (None, None) => return false,
        };

        if let Some(filter) = builtin_filters().iter().find(|re| re.is_match(&check)) {
            debug!(release = name, filter = filter.as_str(), "Rejected bad release");
            return true;
        }

        if let Some((word, _)) = self.ignore_words.iter().find(|(_, re)| re.is_match(&check)) {
            debug!(release = name, word = %word, "Rejected release containing ignore word");
            return true;
        }

        false
    }

    /// Whether `name` starts with one of the show's names followed by a
    /// season, episode, date or part marker.
    #[must_use]
    pub fn is_good_result(&self, name: &str, show: &Show, season: Option<u32>) -> bool {
        let names = self.scene.names_for(show, season);
        let mut candidates: Vec<String> = names.iter().map(|n| sanitize_scene_name(n, false)).collect();
        candidates.extend(names);
        candidates.dedup();

        for candidate in &candidates {
            let Some(re) = show_regex(candidate, show.start_year) else {
                continue;
            };
            if re.is_match(name) {
                debug!(release = name, pattern = re.as_str(), "Result matches show");
                return true;
            }
        }

        debug!(
            release = name,
            show = %show.name,
            season = ?season,
            "Provider result does not look like this show, ignoring it"
        );
        false
    }
}

fn show_regex(show_name: &str, start_year: Option<i32>) -> Option<Regex> {
    let mut escaped = String::new();
    for c in show_name.chars() {
        if c.is_whitespace() || c == '.' || c == '-' {
            escaped.push_str(r"\W+");
        } else {
            escaped.push_str(&regex::escape(&c.to_string()));
        }
    }

    if let Some(year) = start_year {
        escaped.push_str(&format!(r"(?:\W+{year})?"));
    }

    let pattern = format!(
        r"(?i)^{escaped}\W+(?:(?:S\d[\dE._ -])|(?:\d\d?x)|(?:\d{{4}}\W\d\d\W\d\d)|(?:(?:part|pt)[\._ -]?(?:\d|[ivx]))|Season\W+\d+\W+|E\d+\W+)"
    );
    Regex::new(&pattern).ok()
}
