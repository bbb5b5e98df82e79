use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::domain::ShowId;
use crate::models::{Episode, Show};

/// Country names and the short codes release groups use for them.
const COUNTRIES: [(&str, &str); 3] = [("Australia", "AU"), ("Canada", "CA"), ("USA", "US")];

/// An alternative name a show is released under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneException {
    pub show_id: ShowId,

    pub name: String,

    /// Restricts the name to one season; `None` applies to every season.
    #[serde(default)]
    pub season: Option<u32>,
}

/// Builds the name variants used to query providers and to validate results.
#[derive(Debug, Clone, Default)]
pub struct SceneNames {
    exceptions: HashMap<ShowId, Vec<SceneException>>,
}

impl SceneNames {
    #[must_use]
    pub fn new(exceptions: impl IntoIterator<Item = SceneException>) -> Self {
        let mut by_show: HashMap<ShowId, Vec<SceneException>> = HashMap::new();
        for exception in exceptions {
            by_show.entry(exception.show_id).or_default().push(exception);
        }
        Self {
            exceptions: by_show,
        }
    }

    fn exception_names(&self, show_id: ShowId, season: Option<u32>) -> Vec<String> {
        self.exceptions
            .get(&show_id)
            .map(|list| {
                list.iter()
                    .filter(|e| e.season == season)
                    .map(|e| e.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Show id of the show a scene exception name belongs to.
    #[must_use]
    pub fn show_for_exception(&self, name: &str) -> Option<ShowId> {
        self.exceptions
            .values()
            .flatten()
            .find(|e| {
                e.name.eq_ignore_ascii_case(name)
                    || sanitize_scene_name(&e.name, false).eq_ignore_ascii_case(name)
            })
            .map(|e| e.show_id)
    }

    /// Every name variant of `show`: scene exceptions, the canonical and
    /// secondary names, and country suffix rewrites of all of them.
    ///
    /// Season specific exceptions replace the generic names for that season.
    #[must_use]
    pub fn names_for(&self, show: &Show, season: Option<u32>) -> Vec<String> {
        let mut season = season;
        let mut names = self.exception_names(show.id, season);
        if names.is_empty() && season.is_some() {
            season = None;
            names = self.exception_names(show.id, None);
        }

        if matches!(season, None | Some(1)) {
            names.push(show.name.clone());
            if let Some(secondary) = show.tvrage_name.as_ref().filter(|n| !n.is_empty()) {
                names.push(secondary.clone());
            }
        }

        let mut variants = Vec::new();
        for name in names.iter().filter(|n| !n.is_empty()) {
            variants.extend(country_variants(name));
        }
        names.extend(variants);

        dedupe(names)
    }

    /// [`Self::names_for`] in scene form, ready for search strings.
    #[must_use]
    pub fn search_names(&self, show: &Show, season: Option<u32>) -> Vec<String> {
        dedupe(
            self.names_for(show, season)
                .iter()
                .map(|n| sanitize_scene_name(n, false))
                .collect(),
        )
    }

    /// Query strings for one episode: `Show.Name.S01E02` and `Show.Name.1x02`,
    /// or `Show.Name.2010-11-23` for air-by-date shows.
    pub async fn episode_search_strings(&self, show: &Show, episode: &Episode) -> Vec<String> {
        let episode_strings = match (show.air_by_date, episode.air_date) {
            (true, Some(date)) => vec![date.to_string()],
            _ if single_season(show).await => Vec::new(),
            _ => vec![
                format!("S{:02}E{:02}", episode.season, episode.episode),
                format!("{}x{:02}", episode.season, episode.episode),
            ],
        };

        let names = self.search_names(show, Some(episode.season));
        if episode_strings.is_empty() {
            return names;
        }

        names
            .iter()
            .flat_map(|name| episode_strings.iter().map(move |ep| format!("{name}.{ep}")))
            .collect()
    }

    /// Query strings for a whole season (`Show.Name.S02`); single-season shows
    /// are searched by name alone.
    pub async fn season_search_strings(&self, show: &Show, season: u32) -> Vec<String> {
        let names = self.search_names(show, Some(season));
        if single_season(show).await {
            return names;
        }

        names
            .into_iter()
            .map(|name| format!("{name}.S{season:02}"))
            .collect()
    }
}

async fn single_season(show: &Show) -> bool {
    show.seasons().await.iter().filter(|s| **s != 0).count() == 1
}

fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// "Show Australia" and "Show (Australia)" gain "Show (AU)", and the other way round.
fn country_variants(name: &str) -> Vec<String> {
    let pairs = COUNTRIES
        .iter()
        .flat_map(|(long, short)| [(*long, *short), (*short, *long)]);

    let mut variants = Vec::new();
    for (from, to) in pairs {
        let bare = format!(" {from}");
        let bracketed = format!(" ({from})");
        if let Some(stem) = name.strip_suffix(&bare) {
            variants.push(format!("{stem} ({to})"));
        } else if let Some(stem) = name.strip_suffix(&bracketed) {
            variants.push(format!("{stem} ({to})"));
        }
    }
    variants
}

/// Scene form of a show name: punctuation dropped, spaces and slashes become
/// dots, `&` becomes `and`.
///
/// The EZRSS variant keeps `:` and `!`, which that feed leaves in its names.
#[must_use]
pub fn sanitize_scene_name(name: &str, ezrss: bool) -> String {
    let bad_chars: &[char] = if ezrss {
        &[',', '(', ')', '\'', '?']
    } else {
        &[',', ':', '(', ')', '\'', '!', '?']
    };

    let name: String = name.chars().filter(|c| !bad_chars.contains(c)).collect();
    let name = name
        .replace("- ", ".")
        .replace(' ', ".")
        .replace('&', "and")
        .replace('/', ".");

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '.' && out.ends_with('.') {
            continue;
        }
        out.push(c);
    }

    if out.ends_with('.') {
        out.pop();
    }
    out
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Display forms of a name taken from a scene release: with `&` for `and`,
/// and with the trailing year or country put in brackets.
#[must_use]
pub fn scene_to_normal_show_names(name: &str) -> Vec<String> {
    static AND: OnceLock<Regex> = OnceLock::new();
    static YEAR: OnceLock<Regex> = OnceLock::new();
    static COUNTRY: OnceLock<Regex> = OnceLock::new();

    if name.is_empty() {
        return Vec::new();
    }

    let and = get_regex(&AND, r"(?i)([. ])and([. ])");
    let year = get_regex(&YEAR, r"(\D)(\d{4})$");
    let country = get_regex(&COUNTRY, r"(?i)([. _-])(AU|CA|US)$");

    let mut base = vec![name.to_string()];
    let with_ampersand = and.replace_all(name, "$1&$2").into_owned();
    if with_ampersand != name {
        base.push(with_ampersand);
    }

    let mut results = Vec::new();
    for current in &base {
        results.push(year.replace(current, "$1($2)").into_owned());
        results.push(country.replace(current, "$1($2)").into_owned());
    }
    results.extend(base);

    dedupe(results)
}
