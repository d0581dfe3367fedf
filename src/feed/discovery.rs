use scraper::{Html, Selector};
use url::Url;

pub const RSS_MIME: &str = "application/rss+xml";
pub const ATOM_MIME: &str = "application/atom+xml";

/// A feed `<link>` found in an HTML page, with `href` already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLink {
    /// Absolute feed URL, fragment stripped
    pub href: String,
    /// The element's `title` attribute, verbatim
    pub title: Option<String>,
}

/// Finds the first syndication-feed `<link>` in an HTML document.
///
/// Matching is on the `type` attribute only (case-insensitive, MIME parameters
/// ignored), so `rel="alternate"` is not required. Elements are considered in
/// document order and the first one with a usable `href` wins.
#[derive(Debug, Clone)]
pub struct FeedLinkExtractor {
    feed_types: Vec<String>,
}

impl Default for FeedLinkExtractor {
    fn default() -> Self {
        Self::new(vec![RSS_MIME.to_owned(), ATOM_MIME.to_owned()])
    }
}

impl FeedLinkExtractor {
    /// * `feed_types` - MIME types accepted as feeds, e.g. `application/rss+xml`
    pub fn new(feed_types: Vec<String>) -> Self {
        Self { feed_types }
    }

    /// Scans `html` for feed links and resolves the first usable one against `base_url`.
    ///
    /// `base_url` must be the URL the page was actually served from (after
    /// redirects), otherwise path-relative links resolve to the wrong place.
    ///
    /// Returns `None` when no element matches. A matching element whose `href`
    /// is missing, blank, or does not resolve to an http(s) URL is skipped and
    /// scanning continues.
    pub fn extract(&self, html: &str, base_url: &Url) -> Option<FeedLink> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("link[type]").ok()?;

        document.select(&selector).find_map(|link| {
            let element = link.value();
            if !element.attr("type").is_some_and(|t| self.is_feed_type(t)) {
                return None;
            }

            let href = element
                .attr("href")
                .map(str::trim)
                .filter(|href| !href.is_empty())?;
            let resolved = resolve_url(href, base_url)?;

            Some(FeedLink {
                href: resolved,
                title: element.attr("title").map(str::to_owned),
            })
        })
    }

    fn is_feed_type(&self, declared: &str) -> bool {
        let mime = declared.split(';').next().unwrap_or(declared).trim();
        self.feed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

/// Joins `href` onto `base` with standard URL resolution and drops the fragment.
///
/// Handles absolute, scheme-relative (`//host/path`), absolute-path and
/// path-relative references alike. Non-http(s) results (`javascript:`,
/// `data:`) are rejected.
fn resolve_url(href: &str, base: &Url) -> Option<String> {
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.into())
}
