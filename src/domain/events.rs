//! Events emitted by the search tasks.
//!
//! They are published on a broadcast channel; the daemon logs them and any other
//! subscriber (a notifier, a UI) can listen in.

use serde::Serialize;

use super::{EpisodeKey, ShowId};
use crate::quality::Quality;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SearchEvent {
    TaskStarted {
        task: String,
    },
    TaskFinished {
        task: String,
        snatched: usize,
    },
    TaskSkipped {
        task: String,
    },

    Snatched {
        show_id: ShowId,
        show_name: String,
        release: String,
        provider: String,
        quality: Quality,
        episodes: Vec<EpisodeKey>,
        proper: bool,
    },

    ProviderFailed {
        provider: String,
        message: String,
    },
}
