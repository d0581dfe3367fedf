//! Feed discovery on friends' homepages and OPML export.
//!
//! - [`discovery`] - finds the first RSS/Atom `<link>` in an HTML page
//! - [`collector`] - fetches a batch of homepages concurrently and attaches feeds
//! - [`opml`] - renders the result as an OPML 2.0 subscription list
//!
//! # Example
//!
//! ```ignore
//! use crate::feed::{FeedCollector, FeedLinkExtractor};
//!
//! let collector = FeedCollector::new(http, FeedLinkExtractor::default(), timeout);
//! let augmented = collector.collect_batch(&friends).await;
//! ```

mod collector;
mod discovery;
mod opml;

pub use collector::FeedCollector;
pub use discovery::{FeedLink, FeedLinkExtractor, ATOM_MIME, RSS_MIME};
pub use opml::{export_opml, export_to_file, OpmlFeed};
