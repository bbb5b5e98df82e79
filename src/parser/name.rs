use crate::models::ParsedRelease;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unable to parse release name: {0}")]
    NoMatch(String),

    #[error("invalid air date {year}-{month:02}-{day:02} in release name: {name}")]
    InvalidAirDate {
        name: String,
        year: i32,
        month: u32,
        day: u32,
    },
}

type FamilyResult = Result<Option<ParsedRelease>, ParseError>;

/// Pattern families in evaluation order; the first one that matches wins.
const FAMILIES: [(&str, fn(&str) -> FamilyResult); 12] = [
    ("standard_repeat", standard_repeat),
    ("fov_repeat", fov_repeat),
    ("standard", standard),
    ("fov", fov),
    ("scene_date_format", scene_date_format),
    ("stupid", stupid),
    ("verbose", verbose),
    ("season_only", season_only),
    ("no_season_multi_ep", no_season_multi_ep),
    ("no_season_general", no_season_general),
    ("bare", bare),
    ("no_season", no_season),
];

/// Parses release and file names into a [`ParsedRelease`].
///
/// With `file_name` set, a trailing extension is stripped and the parent
/// directory is parsed too: numbering comes from the file, while series name,
/// extra info and group prefer the directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameParser {
    file_name: bool,
}

impl NameParser {
    #[must_use]
    pub const fn new(file_name: bool) -> Self {
        Self { file_name }
    }

    /// Parser for release titles as listed by providers.
    #[must_use]
    pub const fn release() -> Self {
        Self::new(false)
    }

    pub fn parse(&self, name: &str) -> Result<ParsedRelease, ParseError> {
        let (dir_name, file_name) = split_path(name);
        let base_file_name = if self.file_name {
            strip_extension(file_name)
        } else {
            file_name
        };

        let file_result = parse_string(base_file_name)?;
        let dir_result = parse_string(dir_name)?;

        let mut result = ParsedRelease::new(name);

        result.air_date = file_result
            .as_ref()
            .and_then(|r| r.air_date)
            .or_else(|| dir_result.as_ref().and_then(|r| r.air_date));

        if result.air_date.is_none() {
            result.season = file_result
                .as_ref()
                .and_then(|r| r.season)
                .or_else(|| dir_result.as_ref().and_then(|r| r.season));
            result.episodes = file_result
                .as_ref()
                .or(dir_result.as_ref())
                .map(|r| r.episodes.clone())
                .unwrap_or_default();
        }

        let prefer_dir = |field: fn(&ParsedRelease) -> Option<String>| {
            dir_result
                .as_ref()
                .and_then(field)
                .or_else(|| file_result.as_ref().and_then(field))
        };
        result.series_name = prefer_dir(|r| r.series_name.clone());
        result.extra_info = prefer_dir(|r| r.extra_info.clone());
        result.release_group = prefer_dir(|r| r.release_group.clone());

        if result.air_date.is_none() && result.season.is_none() && result.episodes.is_empty() {
            return Err(ParseError::NoMatch(name.to_string()));
        }

        Ok(result)
    }
}

fn parse_string(name: &str) -> FamilyResult {
    if name.is_empty() {
        return Ok(None);
    }

    for (family, matcher) in FAMILIES {
        if let Some(mut release) = matcher(name)? {
            trace!(family, name, "Release name matched pattern family");
            release.original_name = name.to_string();
            return Ok(Some(release));
        }
    }

    Ok(None)
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Turns a raw series capture into a display name.
///
/// `.` and `_` become spaces except inside decimal numbers ("1.0"), whitespace
/// runs collapse and trailing hyphens go. Applying it twice changes nothing.
#[must_use]
pub fn clean_series_name(series_name: &str) -> String {
    let mut current = series_name.to_string();
    // one pass can leave a dot shadowed by a neighbouring replacement
    loop {
        let next = clean_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn clean_once(series_name: &str) -> String {
    static WORD_DOT_WORD: OnceLock<Regex> = OnceLock::new();
    static DOT_YEAR: OnceLock<Regex> = OnceLock::new();
    static DOT_WORD: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let name = get_regex(&WORD_DOT_WORD, r"(\D)\.([^\s\d])").replace_all(series_name, "$1 $2");
    let name = get_regex(&DOT_YEAR, r"(\d)\.(\d{4})").replace_all(&name, "$1 $2");
    let name = replace_trailing_word_dots(&name);
    let name = get_regex(&DOT_WORD, r"\.([^\s\d])").replace_all(&name, " $1");
    let name = name.replace('_', " ");
    let name = get_regex(&WHITESPACE, r"\s+").replace_all(&name, " ");

    name.trim_end_matches(|c: char| c == '-' || c.is_whitespace())
        .trim_start()
        .to_string()
}

/// Replaces the dot in "X." with a space when X is not a digit and the dot is
/// not followed by whitespace.
fn replace_trailing_word_dots(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next_is_dot = chars.get(i + 1) == Some(&'.');
        let after_dot_ok = chars.get(i + 2).is_none_or(|n| !n.is_whitespace());

        if !c.is_ascii_digit() && next_is_dot && after_dot_ok {
            out.push(c);
            out.push(' ');
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
}

fn split_path(name: &str) -> (&str, &str) {
    match name.rsplit_once(['/', '\\']) {
        Some((dir, file)) => {
            let parent = dir.rsplit(['/', '\\']).next().unwrap_or(dir);
            (parent, file)
        }
        None => ("", name),
    }
}

fn strip_extension(file_name: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^(.*)\.\w{3,4}$");
    re.captures(file_name)
        .and_then(|c| c.get(1))
        .map_or(file_name, |m| m.as_str())
}

fn series(caps: &Captures) -> Option<String> {
    caps.name("series_name")
        .map(|m| clean_series_name(m.as_str()))
        .filter(|s| !s.is_empty())
}

fn number(caps: &Captures, group: &str) -> Option<u32> {
    caps.name(group)?.as_str().parse().ok()
}

/// Decimal or lowercase/uppercase roman numeral up to fifteen.
fn convert_number(text: &str) -> Option<u32> {
    const ROMAN: [&str; 15] = [
        "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv",
        "xv",
    ];

    let lower = text.to_ascii_lowercase();
    ROMAN
        .iter()
        .position(|r| *r == lower)
        .and_then(|i| u32::try_from(i + 1).ok())
        .or_else(|| text.parse().ok())
}

fn episode_range(first: u32, extras: &[u32]) -> Vec<u32> {
    match extras.last() {
        Some(&last) if last >= first => (first..=last).collect(),
        Some(_) => {
            let mut episodes = vec![first];
            for extra in extras {
                if !episodes.contains(extra) {
                    episodes.push(*extra);
                }
            }
            episodes
        }
        None => vec![first],
    }
}

/// Splits "Extra.Info-GROUP" on its last hyphen.
///
/// The group must be non-empty without spaces, and the hyphen must not follow
/// a separator or the "WEB" of a WEB-DL tag.
fn split_group(rest: &str) -> (Option<String>, Option<String>) {
    if rest.is_empty() {
        return (None, None);
    }

    if let Some(idx) = rest.rfind('-') {
        let (extra, group) = (&rest[..idx], &rest[idx + 1..]);
        let clean_boundary = extra
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, '.' | ' ' | '_' | '-'));
        let after_web = extra
            .get(extra.len().saturating_sub(3)..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case("web"));

        if clean_boundary && !after_web && !group.is_empty() && !group.contains(' ') {
            return (Some(extra.to_string()), Some(group.to_string()));
        }
    }

    (Some(rest.to_string()), None)
}

fn trim_separators(text: &str) -> &str {
    text.trim_start_matches(['.', ' ', '_', '-'])
}

fn starts_with_resolution(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?i)^(?:1080|720|480)[pi]").is_match(text)
}

fn with_extra(mut release: ParsedRelease, rest: &str) -> ParsedRelease {
    let (extra_info, release_group) = split_group(rest);
    release.extra_info = extra_info;
    release.release_group = release_group;
    release
}

/// Consumes `Sxx[Eyy]` repeats of the same season at the start of `tail`.
fn repeated_episodes<'a>(repeat: &Regex, tail: &'a str, season_text: &str) -> (Vec<u32>, &'a str) {
    let mut rest = tail;
    let mut extras = Vec::new();

    while let Some(caps) = repeat.captures(rest) {
        if caps["season_num"] != *season_text {
            break;
        }
        let Some(episode) = number(&caps, "ep_num") else {
            break;
        };
        extras.push(episode);
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }

    (extras, rest)
}

fn standard_repeat(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    static REPEAT: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?P<series_name>.+?)[. _-]+s(?P<season_num>\d+)[. _-]*e(?P<ep_num>\d+)(?P<tail>[. _-]+s\d+[. _-]*e\d+.*)$",
    );
    let repeat = get_regex(
        &REPEAT,
        r"(?i)^[. _-]+s(?P<season_num>\d+)[. _-]*e(?P<ep_num>\d+)",
    );

    Ok(repeat_family(re, repeat, name))
}

fn fov_repeat(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    static REPEAT: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?P<series_name>.+?)[. _-]+(?P<season_num>\d+)x(?P<ep_num>\d+)(?P<tail>[. _-]+\d+x\d+.*)$",
    );
    let repeat = get_regex(&REPEAT, r"(?i)^[. _-]+(?P<season_num>\d+)x(?P<ep_num>\d+)");

    Ok(repeat_family(re, repeat, name))
}

fn repeat_family(re: &Regex, repeat: &Regex, name: &str) -> Option<ParsedRelease> {
    let caps = re.captures(name)?;
    let season_text = caps.name("season_num")?.as_str();
    let first = number(&caps, "ep_num")?;

    let (extras, rest) = repeated_episodes(repeat, caps.name("tail")?.as_str(), season_text);
    if extras.is_empty() {
        return None;
    }

    let release = ParsedRelease {
        series_name: series(&caps),
        season: season_text.parse().ok(),
        episodes: episode_range(first, &extras),
        ..ParsedRelease::default()
    };
    Some(with_extra(release, trim_separators(rest)))
}

fn standard(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    static EXTRA: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)[. _-]+)?s(?P<season_num>\d+)[. _-]*e(?P<ep_num>\d+)(?P<tail>.*)$",
    );
    let extra_episode = get_regex(&EXTRA, r"(?i)^(?:[. _-]*e|-)(?P<ep>\d+)");

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let (Some(season), Some(first)) = (number(&caps, "season_num"), number(&caps, "ep_num"))
    else {
        return Ok(None);
    };

    let mut rest = caps.name("tail").map_or("", |m| m.as_str());
    let mut extras = Vec::new();
    while let Some(step) = extra_episode.captures(rest) {
        let Some(digits) = step.name("ep") else {
            break;
        };
        if starts_with_resolution(&rest[digits.start()..]) {
            break;
        }
        let Ok(episode) = digits.as_str().parse() else {
            break;
        };
        extras.push(episode);
        rest = &rest[digits.end()..];
    }

    let release = ParsedRelease {
        series_name: series(&caps),
        season: Some(season),
        episodes: episode_range(first, &extras),
        ..ParsedRelease::default()
    };
    Ok(Some(with_extra(release, trim_separators(rest))))
}

fn fov(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    static EXTRA: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)[\[. _-]+)?(?P<season_num>\d+)x(?P<ep_num>\d+)(?P<tail>.*)$",
    );
    let extra_episode = get_regex(&EXTRA, r"(?i)^(?P<link>[. _-]*x|-)(?P<ep>\d+)");

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let (Some(season), Some(first)) = (number(&caps, "season_num"), number(&caps, "ep_num"))
    else {
        return Ok(None);
    };

    let mut rest = caps.name("tail").map_or("", |m| m.as_str());
    let mut extras = Vec::new();
    while let Some(step) = extra_episode.captures(rest) {
        let (Some(link), Some(digits)) = (step.name("link"), step.name("ep")) else {
            break;
        };
        let from_digits = &rest[digits.start()..];
        // "x264" after an episode is a codec, not another episode
        let codec = link.as_str().to_ascii_lowercase().ends_with('x') && from_digits.starts_with("264");
        if codec || starts_with_resolution(from_digits) {
            break;
        }
        let Ok(episode) = digits.as_str().parse() else {
            break;
        };
        extras.push(episode);
        rest = &rest[digits.end()..];
    }

    let release = ParsedRelease {
        series_name: series(&caps),
        season: Some(season),
        episodes: episode_range(first, &extras),
        ..ParsedRelease::default()
    };
    let rest = rest.trim_start_matches([']', '.', ' ', '_', '-']);
    Ok(Some(with_extra(release, rest)))
}

fn scene_date_format(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)[. _-]+)?(?P<air_year>\d{4})[. _-]+(?P<air_month>\d{2})[. _-]+(?P<air_day>\d{2})(?P<tail>.*)$",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let year: i32 = caps["air_year"].parse().unwrap_or_default();
    let mut month = number(&caps, "air_month").unwrap_or_default();
    let mut day = number(&caps, "air_day").unwrap_or_default();

    // a middle group above twelve can only be the day (YYYY.DD.MM)
    if month > 12 {
        std::mem::swap(&mut month, &mut day);
    }

    let air_date =
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| ParseError::InvalidAirDate {
            name: name.to_string(),
            year,
            month,
            day,
        })?;

    let release = ParsedRelease {
        series_name: series(&caps),
        air_date: Some(air_date),
        ..ParsedRelease::default()
    };
    let rest = trim_separators(caps.name("tail").map_or("", |m| m.as_str()));
    Ok(Some(with_extra(release, rest)))
}

fn stupid(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"^(?P<release_group>.+?)-\w+?[. ]?(?P<season_num>\d{1,2})(?P<ep_num>\d{2})$",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let season_start = caps.name("season_num").map_or(0, |m| m.start());
    if name[season_start..].starts_with("264") {
        return Ok(None);
    }

    Ok(Some(ParsedRelease {
        season: number(&caps, "season_num"),
        episodes: number(&caps, "ep_num").into_iter().collect(),
        release_group: caps.name("release_group").map(|m| m.as_str().to_string()),
        ..ParsedRelease::default()
    }))
}

fn verbose(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?P<series_name>.+?)[. _-]+season[. _-]+(?P<season_num>\d+)[. _-]+episode[. _-]+(?P<ep_num>\d+)[. _-]+(?P<extra_info>.+)$",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    Ok(Some(ParsedRelease {
        series_name: series(&caps),
        season: number(&caps, "season_num"),
        episodes: number(&caps, "ep_num").into_iter().collect(),
        extra_info: caps.name("extra_info").map(|m| m.as_str().to_string()),
        ..ParsedRelease::default()
    }))
}

fn season_only(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    static SPECIAL: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)[. _-]+)?s(?:eason[. _-])?(?P<season_num>\d+)(?P<tail>.*)$",
    );
    let special = get_regex(&SPECIAL, r"(?i)^[. _-]?(?:special|extra)\w*(?:[. _-]|$)");

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let rest = trim_separators(caps.name("tail").map_or("", |m| m.as_str()));
    let release = with_extra(
        ParsedRelease {
            series_name: series(&caps),
            season: number(&caps, "season_num"),
            ..ParsedRelease::default()
        },
        rest,
    );

    // Show.S04.Special is not the whole season
    if release
        .extra_info
        .as_deref()
        .is_some_and(|extra| special.is_match(extra))
    {
        return Ok(None);
    }

    Ok(Some(release))
}

fn no_season_multi_ep(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)[. _-]+)?(?:e(?:p(?:isode)?)?|part|pt)[. _-]?(?P<ep_num>\d+|[ivx]+)(?:[. _-]+(?:and|&|to)[. _-]+|-)(?P<extra_ep_num>\d+|[ivx]+)[. _-](?P<tail>.*)$",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let (Some(first), Some(last)) = (
        convert_number(&caps["ep_num"]),
        convert_number(&caps["extra_ep_num"]),
    ) else {
        return Ok(None);
    };

    let release = ParsedRelease {
        series_name: series(&caps),
        episodes: episode_range(first, &[last]),
        ..ParsedRelease::default()
    };
    let rest = trim_separators(caps.name("tail").map_or("", |m| m.as_str()));
    Ok(Some(with_extra(release, rest)))
}

fn no_season_general(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    static EXTRA: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)[. _-]+)?(?:e(?:p(?:isode)?)?|part|pt)[. _-]?(?:(?P<ep_digits>\d+)(?P<tail_digits>.*)|(?P<ep_roman>[ivx]+)(?P<tail_roman>[. _-].*))$",
    );
    let extra_episode = get_regex(
        &EXTRA,
        r"(?i)^[. _-]+(?:(?:and|&|to)[. _-]+)?(?:e(?:p(?:isode)?)?|part|pt)[. _-]?(?P<ep>\d+|[ivx]+)[. _-]",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let (first, tail) = match (caps.name("ep_digits"), caps.name("ep_roman")) {
        (Some(digits), _) => (digits.as_str(), caps.name("tail_digits")),
        (None, Some(roman)) => (roman.as_str(), caps.name("tail_roman")),
        (None, None) => return Ok(None),
    };
    let Some(first) = convert_number(first) else {
        return Ok(None);
    };

    let mut rest = tail.map_or("", |m| m.as_str());
    let mut extras = Vec::new();
    while let Some(step) = extra_episode.captures(rest) {
        let Some(episode) = step.name("ep").and_then(|m| convert_number(m.as_str())) else {
            return Ok(None);
        };
        extras.push(episode);
        rest = &rest[step.get(0).map_or(0, |m| m.end())..];
    }

    let release = ParsedRelease {
        series_name: series(&caps),
        episodes: episode_range(first, &extras),
        ..ParsedRelease::default()
    };
    Ok(Some(with_extra(release, trim_separators(rest))))
}

fn bare(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    // extra info may not open with a three digit token followed by a separator
    let re = get_regex(
        &RE,
        r"(?i)^(?P<series_name>.+?)[. _-]+(?P<season_num>\d{1,2})(?P<ep_num>\d{2})(?:[. _-]+(?:(?P<extra_info>[^-\d][^-]*|\d[^-\d][^-]*|\d\d[^-\d][^-]*|\d{3}[^-. _][^-]*|\d\d?)(?:-(?P<release_group>.+))?|(?P<extra_digits>\d{3})))?$",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let Some(season) = number(&caps, "season_num") else {
        return Ok(None);
    };
    // years like 1999 and 2010 are not season 19/20
    if season == 19 || season == 20 {
        return Ok(None);
    }

    Ok(Some(ParsedRelease {
        series_name: series(&caps),
        season: Some(season),
        episodes: number(&caps, "ep_num").into_iter().collect(),
        extra_info: caps
            .name("extra_info")
            .or_else(|| caps.name("extra_digits"))
            .map(|m| m.as_str().to_string()),
        release_group: caps.name("release_group").map(|m| m.as_str().to_string()),
        ..ParsedRelease::default()
    }))
}

fn no_season(name: &str) -> FamilyResult {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:(?P<series_name>.+?)(?:[. _-]{2,}|[. _]))?(?P<ep_num>\d{1,2})(?:-(?P<extra_ep_num>\d{1,2}))*[. _-]+(?P<tail>.*)$",
    );

    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let Some(first) = number(&caps, "ep_num") else {
        return Ok(None);
    };
    let extras: Vec<u32> = number(&caps, "extra_ep_num").into_iter().collect();

    let release = ParsedRelease {
        series_name: series(&caps),
        episodes: episode_range(first, &extras),
        ..ParsedRelease::default()
    };
    Ok(Some(with_extra(
        release,
        caps.name("tail").map_or("", |m| m.as_str()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> ParsedRelease {
        NameParser::release()
            .parse(name)
            .unwrap_or_else(|e| panic!("{name}: {e}"))
    }

    fn expect(
        name: &str,
        series: Option<&str>,
        season: Option<u32>,
        episodes: &[u32],
        extra: Option<&str>,
        group: Option<&str>,
    ) {
        let r = parse(name);
        assert_eq!(r.series_name.as_deref(), series, "series of {name}");
        assert_eq!(r.season, season, "season of {name}");
        assert_eq!(r.episodes, episodes, "episodes of {name}");
        assert_eq!(r.extra_info.as_deref(), extra, "extra of {name}");
        assert_eq!(r.release_group.as_deref(), group, "group of {name}");
    }

    #[test]
    fn test_standard_names() {
        expect(
            "Mr.Show.Name.S01E02.Source.Quality.Etc-Group",
            Some("Mr Show Name"),
            Some(1),
            &[2],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect("Show.Name.S01E02", Some("Show Name"), Some(1), &[2], None, None);
        expect(
            "Show Name - S01E02 - My Ep Name",
            Some("Show Name"),
            Some(1),
            &[2],
            Some("My Ep Name"),
            None,
        );
        expect(
            "Show.1.0.Name.S01.E03.My.Ep.Name-Group",
            Some("Show 1.0 Name"),
            Some(1),
            &[3],
            Some("My.Ep.Name"),
            Some("Group"),
        );
        expect(
            "Show.Name-0.2010.S01E02.Source.Quality.Etc-Group",
            Some("Show Name-0 2010"),
            Some(1),
            &[2],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect("S01E02 Ep Name", None, Some(1), &[2], Some("Ep Name"), None);
        expect(
            "Show Name - S06E01 - 2009-12-20 - Ep Name",
            Some("Show Name"),
            Some(6),
            &[1],
            Some("2009-12-20 - Ep Name"),
            None,
        );
        expect(
            "Show Name - S06E01 - -30-",
            Some("Show Name"),
            Some(6),
            &[1],
            Some("30-"),
            None,
        );
    }

    #[test]
    fn test_standard_multi_episode() {
        expect(
            "Show.Name.S01E02E03.Source.Quality.Etc-Group",
            Some("Show Name"),
            Some(1),
            &[2, 3],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect(
            "Mr. Show Name - S01E02-03 - My Ep Name",
            Some("Mr. Show Name"),
            Some(1),
            &[2, 3],
            Some("My Ep Name"),
            None,
        );
        expect("Show.Name.S01.E02.E03", Some("Show Name"), Some(1), &[2, 3], None, None);
    }

    #[test]
    fn test_resolution_is_not_an_episode() {
        expect("Show-Name-S06E01-720p", Some("Show-Name"), Some(6), &[1], Some("720p"), None);
        expect("Show-Name-S06E01-1080i", Some("Show-Name"), Some(6), &[1], Some("1080i"), None);
        expect("Show-Name-1x02-720p", Some("Show-Name"), Some(1), &[2], Some("720p"), None);
    }

    #[test]
    fn test_web_dl_is_not_a_group() {
        expect(
            "Show.Name.S01E02.720p.WEB-DL",
            Some("Show Name"),
            Some(1),
            &[2],
            Some("720p.WEB-DL"),
            None,
        );
    }

    #[test]
    fn test_fov_names() {
        expect(
            "Show_Name.1x02.Source_Quality_Etc-Group",
            Some("Show Name"),
            Some(1),
            &[2],
            Some("Source_Quality_Etc"),
            Some("Group"),
        );
        expect("Show Name 1x02", Some("Show Name"), Some(1), &[2], None, None);
        expect(
            "Show Name 1x02 x264 Test",
            Some("Show Name"),
            Some(1),
            &[2],
            Some("x264 Test"),
            None,
        );
        expect(
            "Show_Name.1x02x03x04.Source_Quality_Etc-Group",
            Some("Show Name"),
            Some(1),
            &[2, 3, 4],
            Some("Source_Quality_Etc"),
            Some("Group"),
        );
        expect(
            "Show Name - 1x02-03-04 - My Ep Name",
            Some("Show Name"),
            Some(1),
            &[2, 3, 4],
            Some("My Ep Name"),
            None,
        );
        expect("1x02 Ep Name", None, Some(1), &[2], Some("Ep Name"), None);
        expect(
            "Show Name [05x12] Ep Name",
            Some("Show Name"),
            Some(5),
            &[12],
            Some("Ep Name"),
            None,
        );
    }

    #[test]
    fn test_repeat_names() {
        expect(
            "Show.Name.S01E02.S01E03.Source.Quality.Etc-Group",
            Some("Show Name"),
            Some(1),
            &[2, 3],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect(
            "Show Name - S01E02 - S01E03 - S01E04 - Ep Name",
            Some("Show Name"),
            Some(1),
            &[2, 3, 4],
            Some("Ep Name"),
            None,
        );
        expect("Show.Name.1x02.1x03", Some("Show Name"), Some(1), &[2, 3], None, None);
        expect(
            "Show Name - 1x02 - 1x03 - 1x04 - Ep Name",
            Some("Show Name"),
            Some(1),
            &[2, 3, 4],
            Some("Ep Name"),
            None,
        );
    }

    #[test]
    fn test_bare_names() {
        expect(
            "Show.Name.102.Source.Quality.Etc-Group",
            Some("Show Name"),
            Some(1),
            &[2],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect(
            "show.name.2010.123.source.quality.etc-group",
            Some("show name 2010"),
            Some(1),
            &[23],
            Some("source.quality.etc"),
            Some("group"),
        );
        expect(
            "show.name.2010.222.123.source.quality.etc-group",
            Some("show name 2010.222"),
            Some(1),
            &[23],
            Some("source.quality.etc"),
            Some("group"),
        );
        expect("Show.Name.102", Some("Show Name"), Some(1), &[2], None, None);
        expect("the.event.401.hdtv-lol", Some("the event"), Some(4), &[1], Some("hdtv"), Some("lol"));
    }

    #[test]
    fn test_special_with_year_fails() {
        let err = NameParser::release()
            .parse("Show.Name.2010.special.hdtv-blah")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::NoMatch("Show.Name.2010.special.hdtv-blah".to_string())
        );
    }

    #[test]
    fn test_stupid_names() {
        expect("tpz-abc102", None, Some(1), &[2], None, Some("tpz"));
        expect("tpz-abc.102", None, Some(1), &[2], None, Some("tpz"));
    }

    #[test]
    fn test_no_season_names() {
        expect(
            "Show Name - 01 - Ep Name",
            Some("Show Name"),
            None,
            &[1],
            Some("Ep Name"),
            None,
        );
        expect("01 - Ep Name", None, None, &[1], Some("Ep Name"), None);
    }

    #[test]
    fn test_no_season_general_names() {
        expect(
            "Deconstructed.E07.1080i.HDTV.DD5.1.MPEG2-TrollHD",
            Some("Deconstructed"),
            None,
            &[7],
            Some("1080i.HDTV.DD5.1.MPEG2"),
            Some("TrollHD"),
        );
        expect(
            "Show Name - Episode 01 - Ep Name",
            Some("Show Name"),
            None,
            &[1],
            Some("Ep Name"),
            None,
        );
        expect(
            "Show.Name.Part.1.and.Part.2.Blah-Group",
            Some("Show Name"),
            None,
            &[1, 2],
            Some("Blah"),
            Some("Group"),
        );
    }

    #[test]
    fn test_part_numbers_roman_and_decimal_agree() {
        let decimal = parse("Show.Name.Part.4.Source.Quality.Etc-Group");
        let roman = parse("Show.Name.Part.IV.Source.Quality.Etc-Group");
        assert_eq!(decimal.episodes, vec![4]);
        assert_eq!(roman.episodes, decimal.episodes);
        assert_eq!(roman.season, None);
    }

    #[test]
    fn test_no_season_multi_ep_names() {
        expect(
            "Show.Name.E23-24.Source.Quality.Etc-Group",
            Some("Show Name"),
            None,
            &[23, 24],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect(
            "Show Name - Episode 01-02 - Ep Name",
            Some("Show Name"),
            None,
            &[1, 2],
            Some("Ep Name"),
            None,
        );
    }

    #[test]
    fn test_season_only_names() {
        expect(
            "Show.Name.S02.Source.Quality.Etc-Group",
            Some("Show Name"),
            Some(2),
            &[],
            Some("Source.Quality.Etc"),
            Some("Group"),
        );
        expect("Show Name Season 2", Some("Show Name"), Some(2), &[], None, None);
        expect("Season 02", None, Some(2), &[], None, None);
        assert!(parse("Show.Name.S02.Source-Group").is_season_pack());
    }

    #[test]
    fn test_season_special_is_not_a_season_pack() {
        let result = NameParser::release().parse("Show.Name.S04.Special.HDTV-GRP");
        assert!(result.map_or(true, |r| !r.is_season_pack()));
    }

    #[test]
    fn test_verbose_names() {
        expect(
            "Show Name Season 1 Episode 2 Ep Name",
            Some("Show Name"),
            Some(1),
            &[2],
            Some("Ep Name"),
            None,
        );
    }

    #[test]
    fn test_scene_date_names() {
        let date = NaiveDate::from_ymd_opt(2010, 11, 23);

        let r = parse("Show.Name.2010.11.23.Source.Quality.Etc-Group");
        assert_eq!(r.air_date, date);
        assert_eq!(r.series_name.as_deref(), Some("Show Name"));
        assert_eq!(r.extra_info.as_deref(), Some("Source.Quality.Etc"));
        assert!(r.is_air_by_date());

        assert_eq!(parse("Show.Name.2010.23.11.Source.Quality.Etc-Group").air_date, date);
        assert_eq!(parse("Show Name - 2010.11.23").air_date, date);

        let r = parse("2010-11-23 - Ep Name");
        assert_eq!(r.series_name, None);
        assert_eq!(r.extra_info.as_deref(), Some("Ep Name"));
        assert_eq!(r.air_date, date);
    }

    #[test]
    fn test_invalid_air_date_is_an_error() {
        let err = NameParser::release()
            .parse("Show.Name.2010.02.31.HDTV-GRP")
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidAirDate { month: 2, day: 31, .. }));
    }

    #[test]
    fn test_file_name_combination() {
        let parser = NameParser::new(true);

        let r = parser
            .parse("/test/path/to/Season 02/03 - Ep Name.avi")
            .unwrap();
        assert_eq!(r.season, Some(2));
        assert_eq!(r.episodes, vec![3]);
        assert_eq!(r.extra_info.as_deref(), Some("Ep Name"));

        let r = parser
            .parse("Show.Name.S02.Source.Quality.Etc-Group/tpz-sn203.avi")
            .unwrap();
        assert_eq!(r.series_name.as_deref(), Some("Show Name"));
        assert_eq!(r.season, Some(2));
        assert_eq!(r.episodes, vec![3]);
        assert_eq!(r.release_group.as_deref(), Some("Group"));

        let r = parser
            .parse("MythBusters.S08E16.720p.HDTV.x264-aAF/aaf-mb.s08e16.720p.mkv")
            .unwrap();
        assert_eq!(r.series_name.as_deref(), Some("MythBusters"));
        assert_eq!(r.extra_info.as_deref(), Some("720p.HDTV.x264"));
        assert_eq!(r.release_group.as_deref(), Some("aAF"));

        let r = parser
            .parse("/Test/TV/Jimmy Fallon/Season 2/Jimmy Fallon - 2010-12-15 - blah.avi")
            .unwrap();
        assert_eq!(r.series_name.as_deref(), Some("Jimmy Fallon"));
        assert_eq!(r.air_date, NaiveDate::from_ymd_opt(2010, 12, 15));
        assert_eq!(r.season, None);
    }

    #[test]
    fn test_standard_names_reparse_identically() {
        for (season, episode) in [(1, 2), (5, 7), (12, 24)] {
            let name = format!("Some.Show.S{season:02}E{episode:02}.HDTV.x264-GRP");
            let first = parse(&name);
            let rendered = format!(
                "{}.S{:02}E{:02}.{}-{}",
                first.series_name.as_deref().unwrap_or_default().replace(' ', "."),
                first.season.unwrap_or_default(),
                first.episodes[0],
                first.extra_info.as_deref().unwrap_or_default(),
                first.release_group.as_deref().unwrap_or_default()
            );
            let second = parse(&rendered);
            assert_eq!(first.season, Some(season));
            assert_eq!(first.episodes, vec![episode]);
            assert_eq!(
                (second.series_name, second.season, second.episodes),
                (first.series_name, first.season, first.episodes)
            );
        }
    }

    #[test]
    fn test_clean_series_name() {
        assert_eq!(clean_series_name("an.example.1.0.test"), "an example 1.0 test");
        assert_eq!(clean_series_name("an_example_1.0_test"), "an example 1.0 test");
        assert_eq!(clean_series_name("Show.Name-"), "Show Name");
        assert_eq!(clean_series_name("Show -  "), "Show");
    }

    #[test]
    fn test_clean_series_name_is_idempotent() {
        for raw in [
            "an.example.1.0.test",
            "Show.Name-0.2010",
            "a..1",
            "1.2345.6789",
            "Mr. Show__Name--",
            "x.y.z...",
            "  lead._trail -",
        ] {
            let once = clean_series_name(raw);
            assert_eq!(clean_series_name(&once), once, "{raw}");
        }
    }
}
