use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use fanbox_core::{Aggregator, DownloadUnit, MetadataFormat, PageKind, PlanNames, ReconstructOptions};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, FanboxApi};
use crate::fetch::{log_line, ProgressSink};
use crate::EngineEvent;

pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);
/// Posts per page assumed until the first page arrives.
const INITIAL_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSettings {
    pub ignore_free: bool,
    /// Maximum number of accepted posts; `None` or zero means unlimited.
    pub limit: Option<u32>,
    pub metadata_format: MetadataFormat,
    /// Pause before each individual post request and after each page.
    pub rate_limit: Duration,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            ignore_free: false,
            limit: None,
            metadata_format: MetadataFormat::default(),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to fetch the post index of {creator_id}: {source}")]
    PostIndex {
        creator_id: String,
        #[source]
        source: ApiError,
    },
}

/// Gathers every accepted post of `page` into a [`DownloadUnit`].
///
/// A cancelled run still returns what was collected so far.
pub async fn collect(
    api: &dyn FanboxApi,
    page: &PageKind,
    settings: &CollectSettings,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<DownloadUnit, CollectError> {
    let creator_id = page.creator_id();
    let plans = match api.list_plans(creator_id).await {
        Ok(plans) => PlanNames::from_plans(&plans),
        Err(err) => {
            engine_warn!("Failed to fetch plans of {}: {}", creator_id, err);
            PlanNames::new()
        }
    };
    let options = ReconstructOptions {
        ignore_free: settings.ignore_free,
        metadata_format: settings.metadata_format,
    };
    let mut aggregator = Aggregator::new(creator_id, plans, options);
    aggregator.set_limit(settings.limit);

    match api.featured_tags(creator_id).await {
        Ok(tags) => aggregator.add_tags(tags.into_iter().map(|featured| featured.tag)),
        Err(err) => engine_warn!("Failed to fetch featured tags of {}: {}", creator_id, err),
    }

    match page.post_id() {
        Some(post_id) => collect_post(api, &mut aggregator, post_id, sink).await,
        None => collect_creator(api, &mut aggregator, settings, sink, cancel).await?,
    }

    let unit = aggregator.finish();
    engine_info!(
        "Collected {} posts and {} files from {}",
        unit.post_count,
        unit.file_count,
        unit.id
    );
    Ok(unit)
}

async fn collect_post(
    api: &dyn FanboxApi,
    aggregator: &mut Aggregator,
    post_id: &str,
    sink: &dyn ProgressSink,
) {
    sink.emit(EngineEvent::Collecting {
        current: 0,
        total: 1,
    });
    match api.post_info(post_id).await {
        Ok(post) => {
            aggregator.add_post(&post);
        }
        Err(err) => engine_error!("Failed to fetch post {}: {}", post_id, err),
    }
    sink.emit(EngineEvent::Collecting {
        current: 1,
        total: 1,
    });
}

async fn collect_creator(
    api: &dyn FanboxApi,
    aggregator: &mut Aggregator,
    settings: &CollectSettings,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<(), CollectError> {
    let creator_id = aggregator.creator_id().to_string();
    let pages = api
        .paginate_creator(&creator_id)
        .await
        .map_err(|source| CollectError::PostIndex {
            creator_id: creator_id.clone(),
            source,
        })?;

    let mut estimate = pages.len() * INITIAL_PAGE_SIZE;
    let mut processed = 0;

    for (index, page_url) in pages.iter().enumerate() {
        if cancel.is_cancelled() {
            log_line(sink, "中断しました".to_string());
            return Ok(());
        }
        if !aggregator.is_limit_valid() {
            break;
        }

        let posts = match api.post_list(page_url).await {
            Ok(posts) => posts,
            Err(err) => {
                engine_error!("Failed to fetch page {}/{}: {}", index + 1, pages.len(), err);
                tokio::time::sleep(settings.rate_limit).await;
                continue;
            }
        };
        if index == 0 {
            estimate = pages.len() * posts.len();
        }
        engine_debug!("Page {}/{} lists {} posts", index + 1, pages.len(), posts.len());

        for post in posts {
            if cancel.is_cancelled() {
                log_line(sink, "中断しました".to_string());
                return Ok(());
            }
            if !aggregator.is_limit_valid() {
                return Ok(());
            }

            if post.has_body() {
                aggregator.add_post(&post);
            } else if !post.is_restricted {
                tokio::time::sleep(settings.rate_limit).await;
                match api.post_info(&post.id).await {
                    Ok(full) => {
                        if cancel.is_cancelled() {
                            continue;
                        }
                        aggregator.add_post(&full);
                    }
                    Err(err) => engine_error!("Failed to fetch post {}: {}", post.id, err),
                }
            }

            processed += 1;
            sink.emit(EngineEvent::Collecting {
                current: processed,
                total: estimate,
            });
        }

        tokio::time::sleep(settings.rate_limit).await;
    }

    Ok(())
}
