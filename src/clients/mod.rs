pub mod feed;
pub mod qbittorrent;
pub mod sabnzbd;

pub use feed::{FeedClient, FeedItem};
pub use qbittorrent::{QBitClient, QBitConfig};
pub use sabnzbd::{SabClient, SabConfig, SabPriority};
