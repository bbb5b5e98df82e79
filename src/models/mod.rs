pub mod release;
pub mod result;
pub mod show;

pub use release::ParsedRelease;
pub use result::{ProperRelease, ResultKind, SearchResult, SeasonSlot};
pub use show::{Episode, Show, ShowRecord};
