use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::friend::Friend;
use crate::http::{FetchOutcome, HttpFetcher};
use crate::twitter::types::{FollowingResponse, Problem, UserLookupResponse};

/// Response header carrying the remaining request budget for the current window.
pub const RATE_LIMIT_HEADER: &str = "x-rate-limit-remaining";

/// Longest slice of a non-JSON error body kept in the error message.
const MAX_DETAIL_CHARS: usize = 200;

/// Errors from the social-graph API. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response, with `title`/`detail` from the error payload
    #[error("API response {status}: {title} -- {detail}")]
    Status {
        status: u16,
        title: String,
        detail: String,
    },
    /// 2xx response that carried `errors` instead of `data`
    #[error("API rejected request: {title} -- {detail}")]
    Rejected { title: String, detail: String },
    /// The request never produced a response (DNS, TLS, timeout)
    #[error("API request failed: {0}")]
    Transport(String),
    /// 2xx response whose body is not the expected JSON
    #[error("malformed API response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The configured base URL cannot carry path segments
    #[error("invalid API base URL: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    /// Builds a [`ApiError::Status`] from a non-2xx response body.
    ///
    /// The API answers errors with `{"title": .., "detail": ..}`; anything else
    /// (an HTML error page from a proxy, an empty body) falls back to the
    /// status's canonical reason and a truncated copy of the body.
    fn from_response(status: StatusCode, body: &str) -> Self {
        let problem = serde_json::from_str::<Problem>(body).ok();
        let (title, detail) = match problem {
            Some(Problem {
                title: Some(title),
                detail,
            }) => (title, detail.unwrap_or_default()),
            _ => (
                status.canonical_reason().unwrap_or("HTTP error").to_owned(),
                body.trim().chars().take(MAX_DETAIL_CHARS).collect(),
            ),
        };

        ApiError::Status {
            status: status.as_u16(),
            title,
            detail,
        }
    }

    fn rejected(errors: &[Problem]) -> Self {
        let first = errors.first().cloned().unwrap_or_default();
        ApiError::Rejected {
            title: first.title.unwrap_or_else(|| "Missing data".to_owned()),
            detail: first
                .detail
                .unwrap_or_else(|| "response contained neither data nor errors".to_owned()),
        }
    }
}

/// One page of the following-list.
#[derive(Debug)]
pub struct FollowingPage {
    pub friends: Vec<Friend>,
    /// Continuation token for the next page; `None` on the last page
    pub next_token: Option<String>,
    /// Value of `x-rate-limit-remaining`, when the header was present and numeric
    pub rate_limit_remaining: Option<u32>,
}

/// Authenticated client for the user lookup and following endpoints.
///
/// Requests are strictly sequential; each following page depends on the
/// previous page's token.
pub struct TwitterApi {
    http: HttpFetcher,
    base: Url,
    bearer: SecretString,
    page_size: u32,
    timeout: Duration,
}

impl TwitterApi {
    /// * `base` - API root including the version, e.g. `https://api.twitter.com/2`
    /// * `page_size` - `max_results` sent with each following request
    /// * `timeout` - per-request budget
    pub fn new(
        http: HttpFetcher,
        base: Url,
        bearer: SecretString,
        page_size: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base,
            bearer,
            page_size,
            timeout,
        }
    }

    /// Resolves a username to the account's numeric id.
    ///
    /// # Errors
    ///
    /// Any non-2xx status, transport failure, or a 200 response reporting the
    /// username as unknown.
    pub async fn lookup_user_id(&self, username: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["users", "by", "username", username])?;
        let (body, rate_limit_remaining) = self.get(&url).await?;

        let response: UserLookupResponse = serde_json::from_str(&body)?;
        match response.data {
            Some(user) => {
                tracing::debug!(
                    username = %user.username,
                    id = %user.id,
                    rate_limit_remaining = ?rate_limit_remaining,
                    "Resolved user id"
                );
                Ok(user.id)
            }
            None => Err(ApiError::rejected(&response.errors)),
        }
    }

    /// Retrieves the complete following-list of `user_id`.
    ///
    /// Pages are requested one at a time until a page arrives without
    /// `meta.next_token`; entries keep the order the API returned them in,
    /// first page first.
    pub async fn list_following(&self, user_id: &str) -> Result<Vec<Friend>, ApiError> {
        let mut friends = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.following_page(user_id, token.as_deref()).await?;
            pages += 1;

            tracing::info!(
                page = pages,
                count = page.friends.len(),
                total = friends.len() + page.friends.len(),
                rate_limit_remaining = ?page.rate_limit_remaining,
                "Fetched following page"
            );

            friends.extend(page.friends);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(friends)
    }

    /// Fetches a single page of the following-list.
    ///
    /// `pagination_token` is passed through unchanged; `None` requests the first page.
    pub async fn following_page(
        &self,
        user_id: &str,
        pagination_token: Option<&str>,
    ) -> Result<FollowingPage, ApiError> {
        let mut url = self.endpoint(&["users", user_id, "following"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("max_results", &self.page_size.to_string())
                .append_pair("user.fields", "username,url");
            if let Some(token) = pagination_token {
                query.append_pair("pagination_token", token);
            }
        }

        let (body, rate_limit_remaining) = self.get(&url).await?;
        let response: FollowingResponse = serde_json::from_str(&body)?;

        if !response.errors.is_empty() {
            tracing::warn!(
                errors = response.errors.len(),
                "Following page reported partial errors"
            );
        }

        // An empty token would request the first page again
        let next_token = response.meta.next_token.filter(|t| !t.is_empty());

        Ok(FollowingPage {
            friends: response.data.into_iter().map(Friend::from).collect(),
            next_token,
            rate_limit_remaining,
        })
    }

    async fn get(&self, url: &Url) -> Result<(String, Option<u32>), ApiError> {
        match self
            .http
            .fetch_authorized(url, &self.bearer, self.timeout)
            .await
        {
            FetchOutcome::Success { headers, body, .. } => {
                Ok((body, rate_limit_remaining(&headers)))
            }
            FetchOutcome::HttpError { status, body } => {
                Err(ApiError::from_response(status, &body))
            }
            FetchOutcome::TransportError { message, .. } => Err(ApiError::Transport(message)),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn rate_limit_remaining(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(RATE_LIMIT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
