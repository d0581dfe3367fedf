//! Timeout-bounded GET wrapper shared by the API client and the homepage scraper.
//!
//! Every request resolves to a [`FetchOutcome`] rather than a `Result`: callers
//! decide whether a failed exchange is fatal (the social-graph API) or only
//! worth a warning (a friend's homepage).

use encoding_rs::{Encoding, UTF_8};
use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

/// Redirect hops followed before the request is abandoned.
const MAX_REDIRECTS: usize = 10;
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Why a request never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The exchange exceeded its time budget
    Timeout,
    /// TLS certificate verification failed
    Certificate,
    /// DNS, TCP or TLS handshake failure other than certificate verification
    Connect,
    /// Response body exceeded the 5MB limit
    TooLarge,
    /// Anything else (unparseable URL, redirect loop, broken body stream)
    Other,
}

/// Result of a single HTTP attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response. `final_url` is the URL after following redirects.
    Success {
        status: StatusCode,
        headers: HeaderMap,
        final_url: Url,
        body: String,
    },
    /// Non-2xx response; the body is kept so the caller can decode error payloads.
    HttpError { status: StatusCode, body: String },
    /// No usable response at all.
    TransportError { kind: TransportKind, message: String },
}

/// Thin wrapper around a shared [`reqwest::Client`].
///
/// Cloning is cheap; the underlying connection pool is reference counted.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client that follows up to 10 redirects and identifies itself
    /// with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }

    /// Issues an unauthenticated GET. `timeout` covers connect, headers and body.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        self.send(self.client.get(url), timeout).await
    }

    /// Issues a GET carrying `Authorization: Bearer <token>`.
    pub async fn fetch_authorized(
        &self,
        url: &Url,
        bearer: &SecretString,
        timeout: Duration,
    ) -> FetchOutcome {
        let request = self
            .client
            .get(url.clone())
            .bearer_auth(bearer.expose_secret());
        self.send(request, timeout).await
    }

    async fn send(&self, request: reqwest::RequestBuilder, timeout: Duration) -> FetchOutcome {
        match tokio::time::timeout(timeout, exchange(request)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::TransportError {
                kind: TransportKind::Timeout,
                message: format!("request timed out after {timeout:?}"),
            },
        }
    }
}

async fn exchange(request: reqwest::RequestBuilder) -> FetchOutcome {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return transport_error(&e),
    };

    let status = response.status();
    let headers = response.headers().clone();
    let final_url = response.url().clone();

    if !status.is_success() {
        // Error bodies are best effort; the status alone is enough to act on
        let body = read_limited_body(response, MAX_BODY_SIZE)
            .await
            .unwrap_or_default();
        return FetchOutcome::HttpError { status, body };
    }

    match read_limited_body(response, MAX_BODY_SIZE).await {
        Ok(body) => FetchOutcome::Success {
            status,
            headers,
            final_url,
            body,
        },
        Err(outcome) => outcome,
    }
}

/// Reads the response body with a size limit and decodes it to UTF-8.
///
/// See [`decode_body`] for how the encoding is chosen.
async fn read_limited_body(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, FetchOutcome> {
    let too_large = || FetchOutcome::TransportError {
        kind: TransportKind::TooLarge,
        message: format!("response exceeds {limit} bytes"),
    };

    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(too_large());
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error(&e))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(decode_body(&bytes, content_type.as_deref()))
}

/// Decodes a body using its BOM, else the `Content-Type` charset, else UTF-8.
///
/// Undecodable sequences become U+FFFD rather than failing the fetch; a page
/// in a legacy encoding that declares no charset comes out lossy.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// `charset` parameter of a `Content-Type` value, unquoted.
fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
    })
}

fn transport_error(err: &reqwest::Error) -> FetchOutcome {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if is_certificate_error(err) {
        TransportKind::Certificate
    } else if err.is_connect() {
        TransportKind::Connect
    } else {
        TransportKind::Other
    };

    FetchOutcome::TransportError {
        kind,
        message: error_chain(err),
    }
}

/// Walks the `source()` chain looking for a TLS certificate verification failure.
///
/// reqwest surfaces rustls errors several layers deep (hyper -> io -> rustls),
/// so the top-level error alone never mentions the certificate.
pub(crate) fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_ascii_lowercase();
        if message.contains("certificate") || message.contains("unknownissuer") {
            return true;
        }
        current = e.source();
    }
    false
}

/// Joins an error and its sources into one line: `outer: inner: root`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        let part = e.to_string();
        if !message.contains(&part) {
            message.push_str(": ");
            message.push_str(&part);
        }
        current = e.source();
    }
    message
}
