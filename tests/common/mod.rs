//! Shared fixtures: an in-memory provider and download client.

#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snatcharr::domain::{EpisodeKey, EpisodeRef, ShowId};
use snatcharr::models::{Episode, ProperRelease, ResultKind, SearchResult, SeasonSlot, Show, ShowRecord};
use snatcharr::providers::{Provider, ProviderError, ProviderKind, RssResults, SeasonResults};
use snatcharr::quality::QualityPolicy;
use snatcharr::services::{DownloadClient, ShowLibrary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Auth,
    Transient,
}

/// A provider answering from canned release names.
pub struct MockProvider {
    name: String,
    kind: ProviderKind,
    failure: Option<Failure>,
    episode_results: Vec<String>,
    season_results: Vec<(SeasonSlot, String, Vec<EpisodeKey>)>,
    rss: Vec<(ShowId, EpisodeKey, String)>,
    propers: Vec<String>,
    payload: Vec<u8>,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str, kind: ProviderKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            failure: None,
            episode_results: Vec::new(),
            season_results: Vec::new(),
            rss: Vec::new(),
            propers: Vec::new(),
            payload: b"data".to_vec(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str, failure: Failure) -> Self {
        let mut provider = Self::new(name, ProviderKind::Torrent);
        provider.failure = Some(failure);
        provider
    }

    pub fn with_episode_results(mut self, names: &[&str]) -> Self {
        self.episode_results = names.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_season_result(mut self, slot: SeasonSlot, name: &str, episodes: Vec<EpisodeKey>) -> Self {
        self.season_results.push((slot, name.to_string(), episodes));
        self
    }

    pub fn with_rss(mut self, show: ShowId, key: EpisodeKey, name: &str) -> Self {
        self.rss.push((show, key, name.to_string()));
        self
    }

    pub fn with_propers(mut self, names: &[&str]) -> Self {
        self.propers = names.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_payload(mut self, payload: &str) -> Self {
        self.payload = payload.as_bytes().to_vec();
        self
    }

    /// Makes the feed sweep and season searches wait until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn result_kind(&self) -> ResultKind {
        match self.kind {
            ProviderKind::Nzb => ResultKind::Nzb,
            ProviderKind::Torrent => ResultKind::Torrent,
        }
    }

    fn result(&self, show: &Arc<Show>, name: &str) -> SearchResult {
        SearchResult::new(
            show.clone(),
            name,
            format!("http://{}.invalid/{name}", self.name),
            &self.name,
            self.result_kind(),
        )
    }

    fn check(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(Failure::Auth) => Err(ProviderError::Auth {
                provider: self.name.clone(),
                message: "invalid api key".to_string(),
            }),
            Some(Failure::Transient) => Err(ProviderError::Transient(anyhow::anyhow!(
                "connection reset by peer"
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn find_episode(
        &self,
        show: &Arc<Show>,
        episode: &Episode,
        _manual: bool,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        self.check()?;
        Ok(self
            .episode_results
            .iter()
            .map(|name| self.result(show, name).with_episodes(vec![episode.key()]))
            .collect())
    }

    async fn find_season_results(
        &self,
        show: &Arc<Show>,
        _season: u32,
    ) -> Result<SeasonResults, ProviderError> {
        self.check()?;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut results = SeasonResults::new();
        for (slot, name, episodes) in &self.season_results {
            results
                .entry(*slot)
                .or_default()
                .push(self.result(show, name).with_episodes(episodes.clone()));
        }
        Ok(results)
    }

    async fn search_rss(&self, library: &ShowLibrary) -> Result<RssResults, ProviderError> {
        self.check()?;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let mut results = RssResults::new();
        for (show_id, key, name) in &self.rss {
            let Some(show) = library.get(*show_id) else {
                continue;
            };
            results
                .entry(EpisodeRef::new(*show_id, *key))
                .or_default()
                .push(self.result(&show, name).with_episodes(vec![*key]));
        }
        Ok(results)
    }

    async fn find_propers(&self, _since: DateTime<Utc>) -> Result<Vec<ProperRelease>, ProviderError> {
        self.check()?;
        Ok(self
            .propers
            .iter()
            .map(|name| ProperRelease {
                name: name.clone(),
                url: format!("http://{}.invalid/{name}", self.name),
                provider: self.name.clone(),
                date: Utc::now(),
                kind: self.result_kind(),
            })
            .collect())
    }

    async fn fetch_result(&self, _result: &SearchResult) -> Result<Vec<u8>, ProviderError> {
        Ok(self.payload.clone())
    }
}

/// A download client that remembers what it was sent.
pub struct RecordingClient {
    accept: bool,
    pub sent: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadClient for RecordingClient {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, result: &SearchResult) -> Result<()> {
        self.sent.lock().unwrap().push(result.name.clone());
        if self.accept {
            Ok(())
        } else {
            bail!("client is offline")
        }
    }
}

pub const SHOW_ID: u32 = 42;

pub fn show_record(quality: QualityPolicy, episodes: Vec<Episode>) -> ShowRecord {
    ShowRecord {
        id: ShowId::new(SHOW_ID),
        name: "Show Name".to_string(),
        tvrage_name: None,
        start_year: None,
        quality,
        air_by_date: false,
        season_folders: true,
        paused: false,
        episodes,
    }
}
