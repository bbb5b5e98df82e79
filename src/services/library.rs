use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::scene::{SceneNames, scene_to_normal_show_names};
use crate::domain::ShowId;
use crate::models::{Show, ShowRecord};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    shows: Vec<ShowRecord>,
}

/// The tracked shows and their episodes.
///
/// The show list is fixed once loaded; episode state lives inside each
/// [`Show`] behind its own lock.
#[derive(Debug)]
pub struct ShowLibrary {
    shows: Vec<Arc<Show>>,
    scene: Arc<SceneNames>,
    path: Option<PathBuf>,
}

impl ShowLibrary {
    #[must_use]
    pub fn new(records: Vec<ShowRecord>, scene: Arc<SceneNames>) -> Self {
        Self {
            shows: records.into_iter().map(|r| Arc::new(Show::new(r))).collect(),
            scene,
            path: None,
        }
    }

    /// Loads the library from a JSON file; a missing file is an empty library.
    pub async fn load(path: &Path, scene: Arc<SceneNames>) -> Result<Self> {
        let file = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<LibraryFile>(&content)
                .with_context(|| format!("Failed to parse show library {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No show library yet, starting empty");
                LibraryFile::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read show library {}", path.display()));
            }
        };

        info!(path = %path.display(), shows = file.shows.len(), "Loaded show library");

        let mut library = Self::new(file.shows, scene);
        library.path = Some(path.to_path_buf());
        Ok(library)
    }

    /// Writes every show, with its current episode states, back to disk.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut file = LibraryFile::default();
        for show in &self.shows {
            file.shows.push(show.snapshot().await);
        }

        let content = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(path = %path.display(), "Saved show library");
        Ok(())
    }

    #[must_use]
    pub fn shows(&self) -> &[Arc<Show>] {
        &self.shows
    }

    #[must_use]
    pub fn get(&self, id: ShowId) -> Option<Arc<Show>> {
        self.shows.iter().find(|s| s.id == id).cloned()
    }

    #[must_use]
    pub fn scene(&self) -> &SceneNames {
        &self.scene
    }

    /// Finds the show a parsed release series name refers to.
    #[must_use]
    pub fn find_by_series_name(&self, series_name: &str) -> Option<Arc<Show>> {
        if let Some(id) = self.scene.show_for_exception(series_name) {
            return self.get(id);
        }

        let wanted: Vec<String> = scene_to_normal_show_names(series_name)
            .iter()
            .map(|n| normalize(n))
            .collect();

        self.shows
            .iter()
            .find(|show| {
                self.scene
                    .names_for(show, None)
                    .iter()
                    .any(|name| wanted.contains(&normalize(name)))
            })
            .cloned()
    }
}

/// Lowercase words separated by single spaces, punctuation dropped.
fn normalize(name: &str) -> String {
    name.to_lowercase()
        .replace('&', " and ")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EpisodeKey;
    use crate::models::Episode;
    use crate::quality::{CompositeStatus, EpisodeStatus, Quality, QualityPolicy};
    use crate::services::scene::SceneException;

    fn record(id: u32, name: &str) -> ShowRecord {
        ShowRecord {
            id: ShowId::new(id),
            name: name.to_string(),
            tvrage_name: None,
            start_year: None,
            quality: QualityPolicy::hd(),
            air_by_date: false,
            season_folders: true,
            paused: false,
            episodes: vec![Episode::new(1, 1, EpisodeStatus::Wanted)],
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("snatcharr-library-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_find_by_series_name() {
        let scene = SceneNames::new([SceneException {
            show_id: ShowId::new(2),
            name: "Law and Order SVU".to_string(),
            season: None,
        }]);
        let library = ShowLibrary::new(
            vec![
                record(1, "The Office (US)"),
                record(2, "Law & Order: Special Victims Unit"),
                record(3, "Mr. Robot"),
            ],
            Arc::new(scene),
        );

        let id = |name: &str| library.find_by_series_name(name).map(|s| s.id.value());
        assert_eq!(id("The Office US"), Some(1));
        assert_eq!(id("Law and Order SVU"), Some(2));
        assert_eq!(id("Law & Order Special Victims Unit"), Some(2));
        assert_eq!(id("Mr Robot"), Some(3));
        assert_eq!(id("Unknown Show"), None);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let path = temp_path();
        let scene = Arc::new(SceneNames::default());

        let mut library = ShowLibrary::new(vec![record(7, "Show Name")], scene.clone());
        library.path = Some(path.clone());

        let show = library.get(ShowId::new(7)).unwrap();
        {
            let mut episodes = show.lock_episodes().await;
            episodes.get_mut(&EpisodeKey::new(1, 1)).unwrap().status =
                CompositeStatus::new(EpisodeStatus::Snatched, Quality::HdTv);
        }
        library.save().await.unwrap();

        let reloaded = ShowLibrary::load(&path, scene).await.unwrap();
        let episode = reloaded
            .get(ShowId::new(7))
            .unwrap()
            .episode(EpisodeKey::new(1, 1))
            .await
            .unwrap();
        assert_eq!(
            episode.status.split(),
            (EpisodeStatus::Snatched, Quality::HdTv)
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_library() {
        let library = ShowLibrary::load(&temp_path(), Arc::new(SceneNames::default()))
            .await
            .unwrap();
        assert!(library.shows().is_empty());
    }
}
