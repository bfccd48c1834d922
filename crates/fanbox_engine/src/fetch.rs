use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};

use crate::{EngineEvent, FailureKind, FetchError};

pub const FANBOX_ORIGIN: &str = "https://www.fanbox.cc";
const SESSION_COOKIE: &str = "FANBOXSESSID";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Value of the `FANBOXSESSID` cookie, sent verbatim when present.
    pub session_id: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 512 * 1024 * 1024,
            session_id: None,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes a progress line to the log and to the sink.
pub(crate) fn log_line(sink: &dyn ProgressSink, line: String) {
    engine_info!("{}", line);
    sink.emit(EngineEvent::Log(line));
}

/// Downloads a single remote file.
#[async_trait::async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let mut headers = session_headers(settings)?;
        headers.insert(REFERER, HeaderValue::from_static("https://www.fanbox.cc/"));
        Ok(Self {
            client: build_client(settings, headers)?,
            max_bytes: settings.max_bytes,
        })
    }
}

#[async_trait::async_trait]
impl FileFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        download(&self.client, url, self.max_bytes).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Fetches `url`, retrying per `policy`. Returns `None` once every attempt failed.
pub async fn fetch_with_retry(
    fetcher: &dyn FileFetcher,
    url: &str,
    name: &str,
    policy: &RetryPolicy,
) -> Option<Bytes> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url).await {
            Ok(bytes) => return Some(bytes),
            Err(err) if attempt < policy.retries => {
                attempt += 1;
                engine_warn!("Retrying {} ({}/{}): {}", name, attempt, policy.retries, err);
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => {
                engine_warn!("Giving up on {} from {}: {}", name, url, err);
                return None;
            }
        }
    }
}

pub(crate) fn session_headers(settings: &FetchSettings) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    if let Some(session) = settings.session_id.as_deref().filter(|s| !s.is_empty()) {
        let value = HeaderValue::from_str(&format!("{SESSION_COOKIE}={session}"))
            .map_err(|err| FetchError::new(FailureKind::InvalidSettings, err.to_string()))?;
        headers.insert(COOKIE, value);
    }
    Ok(headers)
}

pub(crate) fn build_client(
    settings: &FetchSettings,
    headers: HeaderMap,
) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
        .default_headers(headers)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

/// GETs `url` and buffers the body, failing once it exceeds `max_bytes`.
pub(crate) async fn download(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
) -> Result<Bytes, FetchError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

    let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                },
                "response too large",
            ));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                },
                "response too large",
            ));
        }
        bytes.extend_from_slice(&chunk);
    }

    engine_debug!("Fetched {} bytes from {}", bytes.len(), url);
    Ok(Bytes::from(bytes))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
