use engine_logging::engine_debug;
use fanbox_core::{FeaturedTag, Plan, PostInfo};
use reqwest::header::{HeaderValue, ACCEPT, ORIGIN};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::fetch::{build_client, download, session_headers, FetchSettings, FANBOX_ORIGIN};
use crate::{FailureKind, FetchError};

pub const DEFAULT_API_BASE: &str = "https://api.fanbox.cc";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only view of the FANBOX web API.
#[async_trait::async_trait]
pub trait FanboxApi: Send + Sync {
    async fn list_plans(&self, creator_id: &str) -> Result<Vec<Plan>, ApiError>;
    async fn featured_tags(&self, creator_id: &str) -> Result<Vec<FeaturedTag>, ApiError>;
    async fn post_info(&self, post_id: &str) -> Result<PostInfo, ApiError>;
    /// Absolute URLs of every post-list page, newest first.
    async fn paginate_creator(&self, creator_id: &str) -> Result<Vec<String>, ApiError>;
    async fn post_list(&self, page_url: &str) -> Result<Vec<PostInfo>, ApiError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    body: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PostListBody {
    Posts(Vec<PostInfo>),
    Paged { items: Vec<PostInfo> },
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    base_url: String,
    client: reqwest::Client,
    max_bytes: u64,
}

impl ReqwestApi {
    pub fn new(base_url: impl Into<String>, settings: &FetchSettings) -> Result<Self, FetchError> {
        let mut headers = session_headers(settings)?;
        headers.insert(ORIGIN, HeaderValue::from_static(FANBOX_ORIGIN));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(settings, headers)?,
            max_bytes: settings.max_bytes,
        })
    }

    fn endpoint(&self, method: &str, key: &str, value: &str) -> Result<String, FetchError> {
        let mut url = url::Url::parse(&format!("{}/{}", self.base_url, method))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url.into())
    }

    async fn get_body<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        engine_debug!("GET {}", url);
        let bytes = download(&self.client, url, self.max_bytes).await?;
        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map(|envelope| envelope.body)
            .map_err(|source| ApiError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait::async_trait]
impl FanboxApi for ReqwestApi {
    async fn list_plans(&self, creator_id: &str) -> Result<Vec<Plan>, ApiError> {
        let url = self.endpoint("plan.listCreator", "creatorId", creator_id)?;
        let plans: Option<Vec<Plan>> = self.get_body(&url).await?;
        Ok(plans.unwrap_or_default())
    }

    async fn featured_tags(&self, creator_id: &str) -> Result<Vec<FeaturedTag>, ApiError> {
        let url = self.endpoint("tag.getFeatured", "creatorId", creator_id)?;
        let tags: Option<Vec<FeaturedTag>> = self.get_body(&url).await?;
        Ok(tags.unwrap_or_default())
    }

    async fn post_info(&self, post_id: &str) -> Result<PostInfo, ApiError> {
        let url = self.endpoint("post.info", "postId", post_id)?;
        self.get_body(&url).await
    }

    async fn paginate_creator(&self, creator_id: &str) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint("post.paginateCreator", "creatorId", creator_id)?;
        self.get_body(&url).await
    }

    async fn post_list(&self, page_url: &str) -> Result<Vec<PostInfo>, ApiError> {
        match self.get_body::<PostListBody>(page_url).await? {
            PostListBody::Posts(posts) | PostListBody::Paged { items: posts } => Ok(posts),
        }
    }
}
