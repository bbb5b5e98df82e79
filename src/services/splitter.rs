//! Splits a season NZB into per-episode NZBs.
//!
//! A season pack lists every file of every episode. When only some episodes
//! are wanted, the `<file>` elements are grouped by the episode release name
//! found in their subject and each group becomes its own NZB.

use anyhow::{Context, Result, bail};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use tracing::{debug, error, warn};

use crate::domain::EpisodeKey;
use crate::models::{ResultKind, SearchResult};
use crate::parser::NameParser;

/// The `<file>` elements of one episode, as raw XML events.
struct EpisodeFiles {
    name: String,
    events: Vec<Event<'static>>,
}

struct SeasonListing {
    namespace: Option<String>,
    episodes: Vec<EpisodeFiles>,
}

/// Per-episode results carved out of the season NZB `payload` of `result`.
///
/// Fails soft: an unparseable name or payload yields no results.
pub async fn split_season_result(result: &SearchResult, payload: &str) -> Vec<SearchResult> {
    let parsed = match NameParser::release().parse(&result.name) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(release = %result.name, error = %e, "Unable to parse season result, not splitting it");
            return Vec::new();
        }
    };
    let season = parsed.effective_season();

    let listing = match group_episode_files(&result.name, payload, season) {
        Ok(listing) => listing,
        Err(e) => {
            error!(release = %result.name, error = %e, "Unable to split season NZB");
            return Vec::new();
        }
    };

    let mut results = Vec::new();

    for episode_files in &listing.episodes {
        debug!(episode = %episode_files.name, season_pack = %result.name, "Split out episode NZB");

        let Ok(parsed) = NameParser::release().parse(&episode_files.name) else {
            warn!(episode = %episode_files.name, "Unable to parse split episode name, skipping it");
            continue;
        };

        if parsed.effective_season() != season {
            warn!(
                episode = %episode_files.name,
                season_pack = %result.name,
                "Split episode belongs to a different season, ignoring it"
            );
            continue;
        }
        if parsed.episodes.is_empty() {
            warn!(
                episode = %episode_files.name,
                season_pack = %result.name,
                "Split entry is not an episode NZB, ignoring it"
            );
            continue;
        }

        let mut wanted = true;
        for &episode in &parsed.episodes {
            if !result
                .show
                .want_episode(season, episode, result.quality, false)
                .await
                .should_download()
            {
                debug!(
                    episode = %episode_files.name,
                    quality = %result.quality,
                    "Episode not wanted at this quality, dropping split result"
                );
                wanted = false;
                break;
            }
        }
        if !wanted {
            continue;
        }

        let payload = match write_nzb(listing.namespace.as_deref(), &episode_files.events) {
            Ok(payload) => payload,
            Err(e) => {
                error!(episode = %episode_files.name, error = %e, "Unable to build episode NZB");
                continue;
            }
        };

        let episodes = parsed
            .episodes
            .iter()
            .map(|&episode| EpisodeKey::new(season, episode))
            .collect();

        results.push(
            SearchResult::new(
                result.show.clone(),
                episode_files.name.clone(),
                result.url.clone(),
                result.provider.clone(),
                ResultKind::NzbData { payload },
            )
            .with_quality(result.quality)
            .with_episodes(episodes),
        );
    }

    results
}

/// Release name of the show part of a season pack name (`Show.Name` in
/// `Show.Name.S02.HDTV.XviD-GRP`).
fn scene_show_name(name: &str, season: u32) -> Option<String> {
    let pattern = format!(r"(?i)([\w._ ]+)[. ]S{season:02}[. ]([\w._\- ]+)[\- ]([\w_\- ]+?)");
    let re = Regex::new(&pattern).ok()?;
    re.captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Matches the episode release name inside a file subject, numbered as
/// `S02E03`, `2x03` or `203`.
fn episode_subject_regex(show_name: &str, season: u32) -> Result<Regex> {
    let mut show = String::new();
    for c in show_name.chars() {
        if c == ' ' || c == '.' {
            show.push_str("[. ]");
        } else {
            show.push_str(&regex::escape(&c.to_string()));
        }
    }

    let pattern = format!(
        r"(?i)({show}[. ](?:S{season:02}[E0-9]+|{season}x\d+|{season}\d{{2}})[. ][\w._]+-\w+)"
    );
    Regex::new(&pattern).context("building episode subject pattern")
}

fn group_episode_files(name: &str, payload: &str, season: u32) -> Result<SeasonListing> {
    let file_name = name.replace(".nzb", "");
    let Some(show_name) = scene_show_name(&file_name, season) else {
        bail!("{name} does not look like a scene season release");
    };
    let subject_re = episode_subject_regex(&show_name, season)?;

    let mut reader = Reader::from_str(payload);

    let mut namespace = None;
    let mut saw_root = false;
    let mut episodes: Vec<EpisodeFiles> = Vec::new();
    let mut current: Option<(String, Vec<Event<'static>>)> = None;
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("reading NZB XML at byte {}", reader.buffer_position()))?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) if current.is_some() => {
                depth += 1;
                if let Some((_, events)) = current.as_mut() {
                    events.push(Event::Start(e.clone().into_owned()));
                }
            }
            Event::End(ref e) if current.is_some() => {
                if let Some((_, events)) = current.as_mut() {
                    events.push(Event::End(e.clone().into_owned()));
                }
                if depth == 0 {
                    if let Some((episode, events)) = current.take() {
                        match episodes.iter_mut().find(|f| f.name == episode) {
                            Some(existing) => existing.events.extend(events),
                            None => episodes.push(EpisodeFiles {
                                name: episode,
                                events,
                            }),
                        }
                    }
                } else {
                    depth -= 1;
                }
            }
            other if current.is_some() => {
                if let Some((_, events)) = current.as_mut() {
                    events.push(other.into_owned());
                }
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"nzb" => {
                saw_root = true;
                namespace = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"xmlns")
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"file" => {
                let subject = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"subject")
                    .map(|a| {
                        html_escape::decode_html_entities(&String::from_utf8_lossy(&a.value))
                            .to_string()
                    })
                    .unwrap_or_default();

                if let Some(episode) = subject_re
                    .captures(&subject)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                {
                    depth = 0;
                    current = Some((episode, vec![Event::Start(e.clone().into_owned())]));
                } else {
                    reader
                        .read_to_end(e.name())
                        .context("skipping unmatched NZB file")?;
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        bail!("payload has no <nzb> root element");
    }

    Ok(SeasonListing {
        namespace,
        episodes,
    })
}

fn write_nzb(namespace: Option<&str>, events: &[Event<'static>]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("nzb");
    if let Some(ns) = namespace {
        root.push_attribute(("xmlns", ns));
    }
    writer.write_event(Event::Start(root))?;

    for event in events {
        writer.write_event(event.clone())?;
    }

    writer.write_event(Event::End(BytesEnd::new("nzb")))?;

    String::from_utf8(writer.into_inner()).context("NZB output is not UTF-8")
}
