//! Client-facing state of the blog page: the post feed, its discovery bar
//! and the post preview.
//!
//! These types hold no I/O of their own. They emit requests and accept
//! responses so any front end (or a test) can drive them.

pub mod discovery;
pub mod feed;
pub mod preview;

pub use discovery::{DiscoveryAction, DiscoveryBar, FilterState};
pub use feed::{Feed, FeedDriver, FeedEntry, FetchRequest, Status};
pub use preview::{clamp_excerpt, permalink, Excerpt, Preview, ShareTarget};
