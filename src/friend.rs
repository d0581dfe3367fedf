/// A feed found on a friend's homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFeed {
    /// Absolute URL of the RSS/Atom feed, fragment stripped
    pub feed_url: String,
    /// `title` attribute of the `<link>` element, verbatim
    pub title: Option<String>,
    /// Homepage URL after redirects (the base the feed URL was resolved against)
    pub site_url: String,
}

/// One account from the following-list.
///
/// `feed` is attached at most once, by the feed collector; a friend whose
/// homepage could not be fetched or carries no feed link keeps `feed: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friend {
    pub username: String,
    pub url: Option<String>,
    pub feed: Option<DiscoveredFeed>,
}

impl Friend {
    pub fn new(username: impl Into<String>, url: Option<String>) -> Self {
        Self {
            username: username.into(),
            url,
            feed: None,
        }
    }

    /// Declared homepage, if present and non-blank.
    ///
    /// The API reports accounts without a homepage as `"url": ""`.
    pub fn homepage(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Returns a copy with `feed` attached.
    pub fn with_feed(&self, feed: DiscoveredFeed) -> Self {
        Self {
            feed: Some(feed),
            ..self.clone()
        }
    }

    /// Display title for the subscription list: feed title, else username.
    pub fn display_title(&self) -> &str {
        self.feed
            .as_ref()
            .and_then(|feed| feed.title.as_deref())
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(&self.username)
    }
}
