use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::clients::{QBitConfig, SabConfig};
use crate::providers::TorrentRssConfig;
use crate::services::filter::FilterSettings;
use crate::services::scene::SceneException;
use crate::services::scheduler::TaskKind;
use crate::services::tasks::SearchSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub search: SearchConfig,

    pub blackhole: BlackholeConfig,

    pub sabnzbd: SabConfig,

    pub qbittorrent: QBitConfig,

    pub scheduler: SchedulerConfig,

    pub providers: Vec<TorrentRssConfig>,

    pub scene_exceptions: Vec<SceneException>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Where the show library and the snatch history are kept.
    pub data_dir: String,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            data_dir: "data".to_string(),
            event_bus_buffer_size: 100,
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub fn library_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("shows.json")
    }

    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("history.jsonl")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NzbMethod {
    #[default]
    Blackhole,
    Sabnzbd,
    /// NZB results are never snatched.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TorrentMethod {
    #[default]
    Blackhole,
    Qbittorrent,
    /// Torrent results are never snatched.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub nzb_method: NzbMethod,

    pub torrent_method: TorrentMethod,

    /// Releases containing any of these words are rejected.
    pub ignore_words: Vec<String>,

    /// Days between two full backlog searches (default: 7)
    pub backlog_frequency_days: u32,

    pub download_propers: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            nzb_method: NzbMethod::Blackhole,
            torrent_method: TorrentMethod::Blackhole,
            ignore_words: vec![
                "german".to_string(),
                "french".to_string(),
                "core2hd".to_string(),
                "dutch".to_string(),
                "swedish".to_string(),
            ],
            backlog_frequency_days: 7,
            download_propers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackholeConfig {
    pub nzb_dir: String,

    pub torrent_dir: String,
}

impl Default for BlackholeConfig {
    fn default() -> Self {
        Self {
            nzb_dir: "./blackhole/nzb".to_string(),
            torrent_dir: "./blackhole/torrent".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub search_interval_minutes: u64,

    pub backlog_interval_minutes: u64,

    pub proper_interval_minutes: u64,

    /// Cron expressions replace the interval of their task when set.
    pub search_cron: Option<String>,

    pub backlog_cron: Option<String>,

    pub proper_cron: Option<String>,

    /// Run every interval task once right at startup.
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_interval_minutes: 60,
            backlog_interval_minutes: 24 * 60,
            proper_interval_minutes: 24 * 60,
            search_cron: None,
            backlog_cron: None,
            proper_cron: Some("0 0 1 * * *".to_string()),
            run_on_start: false,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn cron_for(&self, kind: TaskKind) -> Option<&str> {
        match kind {
            TaskKind::CurrentSearch => self.search_cron.as_deref(),
            TaskKind::Backlog => self.backlog_cron.as_deref(),
            TaskKind::Propers => self.proper_cron.as_deref(),
        }
    }

    #[must_use]
    pub const fn interval_minutes(&self, kind: TaskKind) -> u64 {
        match kind {
            TaskKind::CurrentSearch => self.search_interval_minutes,
            TaskKind::Backlog => self.backlog_interval_minutes,
            TaskKind::Propers => self.proper_interval_minutes,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("snatcharr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".snatcharr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.general.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "Unknown log format '{}', expected \"pretty\" or \"json\"",
                self.general.log_format
            );
        }

        if self.search.nzb_method == NzbMethod::Sabnzbd && self.sabnzbd.host.is_empty() {
            anyhow::bail!("SABnzbd host cannot be empty when it is the NZB method");
        }

        if self.search.torrent_method == TorrentMethod::Qbittorrent
            && self.qbittorrent.base_url.is_empty()
        {
            anyhow::bail!("qBittorrent URL cannot be empty when it is the torrent method");
        }

        if self.search.backlog_frequency_days == 0 {
            anyhow::bail!("Backlog frequency must be at least one day");
        }

        if self.scheduler.enabled {
            for kind in TaskKind::ALL {
                if self.scheduler.interval_minutes(kind) == 0 && self.scheduler.cron_for(kind).is_none() {
                    anyhow::bail!(
                        "Scheduler interval for {} must be > 0 or a cron expression must be set",
                        kind.job_name()
                    );
                }
            }
        }

        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                anyhow::bail!("Provider name cannot be empty");
            }
            if url::Url::parse(&provider.url).is_err() {
                anyhow::bail!("Provider '{}' has an invalid feed url", provider.name);
            }
            if let Some(search_url) = &provider.search_url
                && !search_url.contains("{query}")
            {
                anyhow::bail!(
                    "Search url of provider '{}' has no {{query}} placeholder",
                    provider.name
                );
            }
        }

        let mut names: Vec<&str> = self.providers.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            anyhow::bail!("Provider names must be unique");
        }

        Ok(())
    }

    #[must_use]
    pub fn filter_settings(&self) -> FilterSettings {
        FilterSettings {
            ignore_words: self.search.ignore_words.clone(),
        }
    }

    #[must_use]
    pub const fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            download_propers: self.search.download_propers,
            backlog_frequency_days: self.search.backlog_frequency_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.search_interval_minutes, 60);
        assert_eq!(config.search.nzb_method, NzbMethod::Blackhole);
        assert_eq!(config.qbittorrent.base_url, "http://localhost:8080");
        assert!(config.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[scheduler]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [search]
            torrent_method = "qbittorrent"
            ignore_words = ["german"]

            [scheduler]
            search_interval_minutes = 30
            backlog_cron = "0 0 3 * * *"

            [[providers]]
            name = "showrss"
            url = "https://showrss.invalid/feed"
            search_url = "https://showrss.invalid/search?q={query}"

            [[scene_exceptions]]
            show_id = 73871
            name = "Futurama (2010)"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.search.torrent_method, TorrentMethod::Qbittorrent);
        assert_eq!(config.scheduler.interval_minutes(TaskKind::CurrentSearch), 30);
        assert_eq!(config.scheduler.cron_for(TaskKind::Backlog), Some("0 0 3 * * *"));
        assert_eq!(config.providers.len(), 1);
        assert!(config.providers[0].enabled);
        assert_eq!(config.scene_exceptions[0].season, None);
        assert_eq!(config.filter_settings().ignore_words, vec!["german"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_provider() {
        let mut config = Config::default();
        config.providers.push(TorrentRssConfig {
            name: "broken".to_string(),
            url: "https://feed.invalid/rss".to_string(),
            search_url: Some("https://feed.invalid/search".to_string()),
            enabled: true,
            min_refresh_minutes: 15,
        });
        assert!(config.validate().is_err());

        config.providers[0].search_url = None;
        config.providers.push(config.providers[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.scheduler.search_interval_minutes = 0;
        assert!(config.validate().is_err());

        config.scheduler.search_cron = Some("0 */15 * * * *".to_string());
        assert!(config.validate().is_ok());
    }
}
