//! The search engine: scene names, filtering, ranking, the coordinator and
//! everything that happens after a result is chosen.

pub mod filter;
pub mod history;
pub mod library;
pub mod propers;
pub mod ranker;
pub mod scene;
pub mod scheduler;
pub mod search;
pub mod snatch;
pub mod splitter;
pub mod tasks;

pub use filter::{FilterSettings, ResultFilter};
pub use history::{History, HistoryAction, HistoryEntry};
pub use library::ShowLibrary;
pub use propers::ProperFinder;
pub use scene::{SceneException, SceneNames};
pub use scheduler::{Scheduler, TaskKind};
pub use search::SearchCoordinator;
pub use snatch::{DownloadClient, SnatchError, SnatchExecutor};
pub use tasks::{SearchSettings, SearchTasks};
