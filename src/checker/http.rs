// src/checker/http.rs
// =============================================================================
// This module checks if external links are alive.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when the server refuses HEAD (405, 501)
// - Never follows redirects: a 3xx is an answer in itself, and an
//   https -> http downgrade must be visible, not silently followed
// - Disables connection pooling so every attempt is a fresh connection
// - Retries transient failures (timeouts, connection errors, 429, 5xx)
// - Checks ftp:// links by opening a TCP connection to the server
// - Remembers results per URL for the rest of the run
// =============================================================================

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::cache::UrlCache;
use super::retry::{with_retry, RetryPolicy};
use crate::config::Config;
use crate::error::Error;
use crate::report::Severity;

// Represents the status of a link after checking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    /// 2xx, or an open FTP port
    Ok,
    /// 3xx; `downgrade` is set when an https URL redirects to http
    Redirect { location: String, downgrade: bool },
    /// 401 / 403: the server is up but won't tell us more
    AccessDenied,
    /// 404, 410 and other client errors
    Broken,
    /// 429 or 5xx
    ServerError,
    /// Request timed out
    Timeout,
    /// Could not connect (DNS failure, refused, reset)
    ConnectError,
    /// SSL/TLS certificate error
    SslError,
    /// Anything else (malformed URL, ...)
    Error,
}

impl LinkStatus {
    // Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LinkStatus::ServerError | LinkStatus::Timeout | LinkStatus::ConnectError
        )
    }
}

// Represents the result of checking a single URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    #[serde(flatten)]
    pub status: LinkStatus,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkCheckResult {
    fn new(url: &str, status: LinkStatus, message: impl Into<String>) -> Self {
        LinkCheckResult {
            url: url.to_string(),
            status,
            message: Some(message.into()),
        }
    }

    // Severity and message of the finding this result turns into, if any
    pub fn problem(&self) -> Option<(Severity, String)> {
        let detail = self.message.as_deref().unwrap_or("unknown error");
        match &self.status {
            LinkStatus::Ok => None,
            LinkStatus::Redirect { location, downgrade } => downgrade.then(|| {
                (
                    Severity::Warning,
                    format!("{} redirects from https to http: {}", self.url, location),
                )
            }),
            LinkStatus::AccessDenied => Some((
                Severity::Warning,
                format!("{} could not be verified ({})", self.url, detail),
            )),
            _ => Some((
                Severity::Error,
                format!("{} is unreachable ({})", self.url, detail),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl From<&Config> for HttpOptions {
    fn from(config: &Config) -> Self {
        HttpOptions {
            timeout: config.timeout(),
            retry: RetryPolicy::from(&config.retry),
            user_agent: config.user_agent.clone(),
        }
    }
}

// Network checker shared by all workers
//
// `Client` is cheap to clone (it's a reference counter internally), and so is
// the cache, so this whole struct is cloned into the workers' context.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    cache: UrlCache,
}

impl HttpChecker {
    pub fn new(options: &HttpOptions) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(HttpChecker {
            client,
            timeout: options.timeout,
            retry: options.retry,
            cache: UrlCache::default(),
        })
    }

    // Number of distinct URLs checked so far
    pub fn checked_urls(&self) -> usize {
        self.cache.len()
    }

    // Checks an http(s) or ftp(s) URL, retrying transient failures
    //
    // Returns `None` when cancelled; nothing is cached in that case.
    pub async fn check(&self, url: &str, cancel: &CancellationToken) -> Option<LinkCheckResult> {
        if let Some(cached) = self.cache.get(url) {
            debug!("Cached result for {}", url);
            return Some(cached);
        }

        let is_ftp = url.get(..3).is_some_and(|s| s.eq_ignore_ascii_case("ftp"));
        let result = with_retry(
            &self.retry,
            cancel,
            |attempt| async move {
                debug!("Checking {} (attempt {})", url, attempt);
                if is_ftp {
                    self.connect_ftp(url).await
                } else {
                    self.request_http(url).await
                }
            },
            |result: &LinkCheckResult| result.status.is_retryable(),
        )
        .await?;

        self.cache.insert(url, result.clone());
        Some(result)
    }

    // One HEAD request, and a GET if the server doesn't do HEAD
    async fn request_http(&self, url: &str) -> LinkCheckResult {
        let response = match self.client.head(url).send().await {
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                self.client.get(url).send().await
            }
            other => other,
        };

        match response {
            Ok(response) => {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                analyze_status(url, response.status(), location.as_deref())
            }
            Err(e) => categorize_error(url, e),
        }
    }

    // FTP servers are only checked for an open control port
    async fn connect_ftp(&self, url: &str) -> LinkCheckResult {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return LinkCheckResult::new(url, LinkStatus::Error, format!("invalid URL: {}", e))
            }
        };
        let Some(host) = parsed.host_str() else {
            return LinkCheckResult::new(url, LinkStatus::Error, "URL has no host");
        };
        let port = parsed.port().unwrap_or(if parsed.scheme() == "ftps" { 990 } else { 21 });

        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                LinkCheckResult::new(url, LinkStatus::Ok, format!("port {} open", port))
            }
            Ok(Err(e)) => LinkCheckResult::new(
                url,
                LinkStatus::ConnectError,
                format!("connection failed: {}", e),
            ),
            Err(_) => LinkCheckResult::new(url, LinkStatus::Timeout, "connection timed out"),
        }
    }
}

// Analyzes an HTTP status code (and the Location header for redirects)
//
// HTTP status codes:
// - 200-299: Success
// - 300-399: Redirect
// - 401, 403: Access denied, can't tell whether the page exists
// - 429, 500-599: Transient, retried
// - other 400-499: Broken
pub fn analyze_status(url: &str, status: StatusCode, location: Option<&str>) -> LinkCheckResult {
    let code = format!("HTTP {}", status.as_u16());

    if status.is_success() {
        LinkCheckResult::new(url, LinkStatus::Ok, code)
    } else if status.is_redirection() {
        // Location may be relative to the requested URL
        let target = location
            .and_then(|loc| Url::parse(url).ok().and_then(|base| base.join(loc).ok()))
            .map(|target| target.to_string())
            .or_else(|| location.map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        let downgrade = url
            .get(..8)
            .is_some_and(|s| s.eq_ignore_ascii_case("https://"))
            && target.starts_with("http://");

        LinkCheckResult::new(
            url,
            LinkStatus::Redirect {
                location: target.clone(),
                downgrade,
            },
            format!("{} -> {}", code, target),
        )
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        LinkCheckResult::new(url, LinkStatus::AccessDenied, code)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        LinkCheckResult::new(url, LinkStatus::ServerError, code)
    } else {
        LinkCheckResult::new(url, LinkStatus::Broken, code)
    }
}

// Categorizes the different ways a request can fail before we get a status
fn categorize_error(url: &str, error: reqwest::Error) -> LinkCheckResult {
    // Convert error to string once; the chain holds the interesting part
    let error_string = format!("{:?}", error).to_lowercase();

    let (status, message) = if error.is_timeout() {
        (LinkStatus::Timeout, "request timed out".to_string())
    } else if error_string.contains("certificate") {
        (LinkStatus::SslError, "SSL certificate error".to_string())
    } else if error.is_connect() {
        if error_string.contains("dns") {
            (LinkStatus::ConnectError, "could not resolve hostname".to_string())
        } else {
            (LinkStatus::ConnectError, "connection failed".to_string())
        }
    } else if error.is_builder() {
        (LinkStatus::Error, format!("invalid URL: {}", error))
    } else {
        (LinkStatus::Error, error.to_string())
    };

    LinkCheckResult::new(url, status, message)
}
