#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, Once};

use bytes::Bytes;
use fanbox_core::{FeaturedTag, Plan, PostInfo};
use fanbox_engine::{
    ApiError, ArchiveError, ArchiveWriter, EngineEvent, FailureKind, FanboxApi, FetchError,
    FileFetcher, ProgressSink,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn http_error(status: u16) -> FetchError {
    FetchError {
        kind: FailureKind::HttpStatus(status),
        message: format!("status {status}"),
    }
}

pub fn post(id: &str, kind: &str, body: Value) -> PostInfo {
    serde_json::from_value(json!({
        "id": id,
        "title": format!("post {id}"),
        "creatorId": "artist",
        "feeRequired": 100,
        "isRestricted": false,
        "tags": [],
        "type": kind,
        "body": body,
    }))
    .unwrap()
}

pub fn text_post(id: &str) -> PostInfo {
    post(id, "text", json!({ "text": format!("text of {id}") }))
}

pub fn image_post(id: &str, urls: &[&str]) -> PostInfo {
    let images: Vec<Value> = urls
        .iter()
        .map(|url| json!({ "originalUrl": url, "extension": "png" }))
        .collect();
    post(id, "image", json!({ "text": "", "images": images }))
}

/// Post as listed on an index page, without its body.
pub fn listed(id: &str) -> PostInfo {
    let mut info = text_post(id);
    info.body = None;
    info
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
    cancel_on_progress: Option<CancellationToken>,
    cancel_on_event: Option<(CancellationToken, EngineEvent)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels `token` as soon as the first file completes.
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_progress: Some(token),
            ..Self::default()
        }
    }

    /// Cancels `token` when `trigger` is emitted.
    pub fn cancelling_on(token: CancellationToken, trigger: EngineEvent) -> Self {
        Self {
            cancel_on_event: Some((token, trigger)),
            ..Self::default()
        }
    }

    pub fn cancelling_on_log(token: CancellationToken, line: &str) -> Self {
        Self::cancelling_on(token, EngineEvent::Log(line.to_string()))
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        if let (Some(token), EngineEvent::Archiving { .. }) = (&self.cancel_on_progress, &event) {
            token.cancel();
        }
        if let Some((token, trigger)) = &self.cancel_on_event {
            if *trigger == event {
                token.cancel();
            }
        }
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct MockApi {
    pub plans: Vec<Plan>,
    pub tags: Vec<FeaturedTag>,
    /// `None` makes the paginated index fail.
    pub pages: Option<Vec<String>>,
    /// Missing pages fail with HTTP 500.
    pub page_posts: HashMap<String, Vec<PostInfo>>,
    pub full_posts: HashMap<String, PostInfo>,
    pub post_requests: Mutex<Vec<String>>,
    /// Cancelled while the named post is being fetched; the post is still returned.
    pub cancel_during_post: Option<(CancellationToken, String)>,
}

impl MockApi {
    pub fn with_pages(pages: Vec<(&str, Vec<PostInfo>)>) -> Self {
        let urls = pages.iter().map(|(url, _)| url.to_string()).collect();
        Self {
            pages: Some(urls),
            page_posts: pages
                .into_iter()
                .map(|(url, posts)| (url.to_string(), posts))
                .collect(),
            ..Self::default()
        }
    }

    pub fn requested_posts(&self) -> Vec<String> {
        self.post_requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FanboxApi for MockApi {
    async fn list_plans(&self, _creator_id: &str) -> Result<Vec<Plan>, ApiError> {
        Ok(self.plans.clone())
    }

    async fn featured_tags(&self, _creator_id: &str) -> Result<Vec<FeaturedTag>, ApiError> {
        Ok(self.tags.clone())
    }

    async fn post_info(&self, post_id: &str) -> Result<PostInfo, ApiError> {
        self.post_requests.lock().unwrap().push(post_id.to_string());
        if let Some((token, id)) = &self.cancel_during_post {
            if id == post_id {
                token.cancel();
            }
        }
        self.full_posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| ApiError::Fetch(http_error(404)))
    }

    async fn paginate_creator(&self, _creator_id: &str) -> Result<Vec<String>, ApiError> {
        self.pages
            .clone()
            .ok_or_else(|| ApiError::Fetch(http_error(503)))
    }

    async fn post_list(&self, page_url: &str) -> Result<Vec<PostInfo>, ApiError> {
        self.page_posts
            .get(page_url)
            .cloned()
            .ok_or_else(|| ApiError::Fetch(http_error(500)))
    }
}

/// Serves canned bytes; unknown URLs fail. `flaky` URLs fail that many times first.
#[derive(Default)]
pub struct MockFetcher {
    pub files: HashMap<String, Vec<u8>>,
    pub flaky: Mutex<HashMap<String, usize>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn serving(urls: &[&str]) -> Self {
        Self {
            files: urls
                .iter()
                .map(|url| (url.to_string(), format!("data:{url}").into_bytes()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait::async_trait]
impl FileFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(remaining) = self.flaky.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(http_error(502));
            }
        }
        self.files
            .get(url)
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| http_error(404))
    }
}

#[derive(Default)]
pub struct MemoryWriter {
    pub entries: Vec<(String, Vec<u8>)>,
    pub close_calls: usize,
    closed: bool,
}

impl MemoryWriter {
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|(path, _)| path.as_str()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ArchiveWriter for MemoryWriter {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        if self.closed {
            return Err(ArchiveError::Closed);
        }
        self.entries.push((path.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), ArchiveError> {
        self.close_calls += 1;
        self.closed = true;
        Ok(())
    }
}
