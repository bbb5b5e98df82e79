mod history;
mod parse;
mod search;
mod tasks;

pub use history::cmd_history;
pub use parse::cmd_parse;
pub use search::{cmd_search_episode, cmd_search_season};
pub use tasks::cmd_run_task;
