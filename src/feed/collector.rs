use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::feed::discovery::FeedLinkExtractor;
use crate::friend::{DiscoveredFeed, Friend};
use crate::http::{FetchOutcome, HttpFetcher, TransportKind};

/// Fetches friends' homepages concurrently and attaches the feed each one advertises.
///
/// Every failure here is per-friend: it is logged and the friend passes through
/// without a feed. Nothing in a batch can fail the batch.
pub struct FeedCollector {
    http: HttpFetcher,
    extractor: FeedLinkExtractor,
    timeout: Duration,
}

impl FeedCollector {
    /// * `timeout` - budget for each homepage fetch, independent of its siblings
    pub fn new(http: HttpFetcher, extractor: FeedLinkExtractor, timeout: Duration) -> Self {
        Self {
            http,
            extractor,
            timeout,
        }
    }

    /// Processes one batch with all of its fetches in flight at once.
    ///
    /// Returns exactly one friend per input friend, in input order. Friends
    /// without a homepage are returned unchanged and cost no request.
    pub async fn collect_batch(&self, friends: &[Friend]) -> Vec<Friend> {
        // `buffered` (not `buffer_unordered`) yields results in input order
        let concurrency = friends.len().max(1);
        stream::iter(friends)
            .map(|friend| self.collect_one(friend))
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn collect_one(&self, friend: &Friend) -> Friend {
        let Some(homepage) = friend.homepage() else {
            return friend.clone();
        };

        let outcome = self.http.fetch(homepage, self.timeout).await;
        self.apply_outcome(friend, homepage, outcome)
    }

    /// Turns one homepage fetch into the friend's final record.
    fn apply_outcome(&self, friend: &Friend, homepage: &str, outcome: FetchOutcome) -> Friend {
        match outcome {
            FetchOutcome::Success {
                final_url, body, ..
            } => match self.extractor.extract(&body, &final_url) {
                Some(link) => friend.with_feed(DiscoveredFeed {
                    feed_url: link.href,
                    title: link.title,
                    site_url: final_url.into(),
                }),
                None => {
                    tracing::debug!(
                        username = %friend.username,
                        url = %final_url,
                        "No feed link on homepage"
                    );
                    friend.clone()
                }
            },
            FetchOutcome::HttpError { status, .. } => {
                tracing::warn!(
                    username = %friend.username,
                    url = %homepage,
                    status = status.as_u16(),
                    "Homepage returned error status"
                );
                friend.clone()
            }
            FetchOutcome::TransportError {
                kind: TransportKind::Certificate,
                message,
            } => {
                tracing::warn!(
                    username = %friend.username,
                    url = %homepage,
                    error = %message,
                    "Invalid certificate for homepage"
                );
                friend.clone()
            }
            FetchOutcome::TransportError { kind, message } => {
                tracing::warn!(
                    username = %friend.username,
                    url = %homepage,
                    kind = ?kind,
                    error = %message,
                    "Request error for homepage"
                );
                friend.clone()
            }
        }
    }
}
