//! End-to-end run: user lookup, following-list, batched feed discovery, OPML outlines.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io::{self, Write};

use crate::config::Config;
use crate::feed::{FeedCollector, FeedLinkExtractor, OpmlFeed};
use crate::friend::Friend;
use crate::http::HttpFetcher;
use crate::twitter::{ApiError, TwitterApi};
use crate::util::sanitize_title;

/// Splits `items` into consecutive batches of `size` (the last may be shorter).
///
/// A `size` of zero is treated as one.
pub fn batches<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}

/// Drives a run for one account.
pub struct FriendFeeder {
    api: TwitterApi,
    collector: FeedCollector,
    batch_size: usize,
}

impl FriendFeeder {
    pub fn new(api: TwitterApi, collector: FeedCollector, batch_size: usize) -> Self {
        Self {
            api,
            collector,
            batch_size,
        }
    }

    /// Wires the API client and collector from a validated [`Config`].
    ///
    /// Both share one HTTP client (and so one connection pool).
    pub fn from_config(config: &Config, bearer: SecretString) -> Result<Self> {
        let http = HttpFetcher::new(&config.user_agent).context("Failed to build HTTP client")?;
        let api = TwitterApi::new(
            http.clone(),
            config.api_url()?,
            bearer,
            config.page_size,
            config.timeout(),
        );
        let collector = FeedCollector::new(
            http,
            FeedLinkExtractor::new(config.feed_types.clone()),
            config.timeout(),
        );
        Ok(Self::new(api, collector, config.batch_size))
    }

    /// Resolves `username`, walks its following-list and discovers feeds.
    ///
    /// Returns every followed account, in API order, each with `feed` set
    /// when one was found. Batches run one after another; fetches within a
    /// batch run concurrently.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the lookup or a following page. No homepage
    /// request is issued before the whole following-list has been retrieved.
    pub async fn run(&self, username: &str) -> Result<Vec<Friend>, ApiError> {
        let user_id = self.api.lookup_user_id(username).await?;
        let following = self.api.list_following(&user_id).await?;

        let total = following.len();
        let batch_count = total.div_ceil(self.batch_size.max(1));
        let mut friends = Vec::with_capacity(total);

        for (index, batch) in batches(&following, self.batch_size).enumerate() {
            friends.extend(self.collector.collect_batch(batch).await);
            tracing::info!(
                batch = index + 1,
                batches = batch_count,
                processed = friends.len(),
                total = total,
                "Batch complete"
            );
        }

        let found = friends.iter().filter(|f| f.feed.is_some()).count();
        tracing::info!(username = %username, friends = total, feeds = found, "Feed discovery finished");

        Ok(friends)
    }
}

/// Title for the exported document's `<head>`.
pub fn document_title(username: &str) -> String {
    format!("Feeds of accounts followed by @{username}")
}

/// Converts friends with a feed into OPML outlines; friends without one are omitted.
///
/// The outline title is the feed's title, falling back to the username when
/// the feed has none (or only whitespace and control characters).
pub fn outlines(friends: &[Friend]) -> Vec<OpmlFeed> {
    friends
        .iter()
        .filter_map(|friend| {
            let feed = friend.feed.as_ref()?;
            let title = sanitize_title(friend.display_title());
            let title = if title.is_empty() {
                friend.username.clone()
            } else {
                title.into_owned()
            };
            Some(OpmlFeed {
                title,
                xml_url: feed.feed_url.clone(),
                html_url: Some(feed.site_url.clone()),
            })
        })
        .collect()
}

/// Writes one `<username>: <feed url or ->` line per friend.
pub fn write_status<W: Write>(friends: &[Friend], out: &mut W) -> io::Result<()> {
    for friend in friends {
        let feed = friend.feed.as_ref().map_or("-", |f| f.feed_url.as_str());
        writeln!(out, "{}: {}", friend.username, feed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friend::DiscoveredFeed;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn with_feed(username: &str, title: Option<&str>) -> Friend {
        Friend::new(username, Some(format!("https://{username}.example.com"))).with_feed(
            DiscoveredFeed {
                feed_url: format!("https://{username}.example.com/feed.xml"),
                title: title.map(str::to_owned),
                site_url: format!("https://{username}.example.com/"),
            },
        )
    }

    proptest! {
        #[test]
        fn prop_batches_cover_input_in_order(items in proptest::collection::vec(any::<u32>(), 0..200), size in 1usize..40) {
            let chunks: Vec<&[u32]> = batches(&items, size).collect();

            prop_assert_eq!(chunks.len(), items.len().div_ceil(size));
            if let Some((last, full)) = chunks.split_last() {
                prop_assert!(full.iter().all(|c| c.len() == size));
                prop_assert!(!last.is_empty() && last.len() <= size);
            }

            let rejoined: Vec<u32> = chunks.concat();
            prop_assert_eq!(rejoined, items);
        }
    }

    #[test]
    fn test_batches_zero_size_treated_as_one() {
        let items = [1, 2, 3];
        assert_eq!(batches(&items, 0).count(), 3);
    }

    #[test]
    fn test_outlines_skip_friends_without_feed() {
        let friends = vec![
            with_feed("alice", Some("Alice's Blog")),
            Friend::new("bob", None),
            Friend::new("carol", Some("https://carol.example.com".to_owned())),
        ];
        assert_eq!(
            outlines(&friends),
            vec![OpmlFeed {
                title: "Alice's Blog".to_owned(),
                xml_url: "https://alice.example.com/feed.xml".to_owned(),
                html_url: Some("https://alice.example.com/".to_owned()),
            }]
        );
    }

    #[test]
    fn test_outline_title_falls_back_to_username() {
        let friends = vec![
            with_feed("untitled", None),
            with_feed("blank", Some("   ")),
            with_feed("noisy", Some("\x1b[1m\x07")),
            with_feed("spaced", Some("  Spaced\n Out ")),
        ];
        let titles: Vec<String> = outlines(&friends).into_iter().map(|o| o.title).collect();
        assert_eq!(titles, vec!["untitled", "blank", "noisy", "Spaced Out"]);
    }

    #[test]
    fn test_write_status_lines() {
        let friends = vec![with_feed("alice", Some("A")), Friend::new("bob", None)];
        let mut out = Vec::new();
        write_status(&friends, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "alice: https://alice.example.com/feed.xml\nbob: -\n"
        );
    }

    #[test]
    fn test_document_title() {
        assert_eq!(document_title("jack"), "Feeds of accounts followed by @jack");
    }
}
