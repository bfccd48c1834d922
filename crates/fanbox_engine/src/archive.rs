//! Turns a serialized [`DownloadUnit`] into archive entries: one index page,
//! then per post an information file, a post page, the cover and the files.

use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_error};
use fanbox_core::{encode_file_name, information_file, DownloadUnit, PostEntry};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::fetch::{fetch_with_retry, log_line, FileFetcher, ProgressSink, RetryPolicy};
use crate::persist::PersistError;
use crate::render::{index_page, post_page};
use crate::EngineEvent;

pub const DEFAULT_FILE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid archive payload: {0}")]
    InvalidPayload(String),
    #[error("archive is already closed")]
    Closed,
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Sink for archive entries. Paths use `/` separators.
pub trait ArchiveWriter: Send {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError>;
    /// Finalizes the archive. Further calls are no-ops.
    fn close(&mut self) -> Result<(), ArchiveError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSettings {
    pub retry: RetryPolicy,
    /// Pause after each content file.
    pub file_delay: Duration,
    /// Shown on the index page.
    pub archived_at: Option<String>,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            file_delay: DEFAULT_FILE_DELAY,
            archived_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub post_count: usize,
    pub file_count: usize,
    /// Posts whose pages were written.
    pub posts_written: usize,
    /// Content files attempted, successful or not.
    pub completed_files: usize,
    pub failed_files: usize,
    pub cancelled: bool,
}

/// Writes the unit encoded in `payload` to `writer`, downloading every file.
///
/// The writer is closed on every path once the payload has been accepted.
pub async fn emit_archive(
    payload: &str,
    writer: &mut dyn ArchiveWriter,
    fetcher: &dyn FileFetcher,
    settings: &ArchiveSettings,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ArchiveSummary, ArchiveError> {
    let unit = parse_payload(payload)?;
    let written = write_unit(&unit, writer, fetcher, settings, sink, cancel).await;
    let closed = writer.close();
    let summary = written?;
    closed?;
    Ok(summary)
}

fn parse_payload(payload: &str) -> Result<DownloadUnit, ArchiveError> {
    let unit: DownloadUnit = serde_json::from_str(payload)
        .map_err(|err| ArchiveError::InvalidPayload(err.to_string()))?;
    unit.validate()
        .map_err(|err| ArchiveError::InvalidPayload(err.to_string()))?;
    Ok(unit)
}

async fn write_unit(
    unit: &DownloadUnit,
    writer: &mut dyn ArchiveWriter,
    fetcher: &dyn FileFetcher,
    settings: &ArchiveSettings,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ArchiveSummary, ArchiveError> {
    let root = encode_file_name(&unit.id);
    let mut summary = ArchiveSummary {
        post_count: unit.post_count,
        file_count: unit.file_count,
        ..ArchiveSummary::default()
    };

    log_line(
        sink,
        format!("@{} 投稿:{} ファイル:{}", unit.id, unit.post_count, unit.file_count),
    );
    let index = index_page(unit, settings.archived_at.as_deref());
    writer.add_file(&format!("{root}/index.html"), index.as_bytes())?;

    let progress = FileProgress {
        total: unit.file_count,
        started: Instant::now(),
    };
    for (position, post) in unit.posts.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        log_line(sink, format!("{} ({}/{})", post.title, position + 1, unit.post_count));
        let dir = format!("{root}/{}", post.encoded_name);
        let finished = write_post(
            &dir,
            post,
            writer,
            fetcher,
            settings,
            sink,
            cancel,
            &progress,
            &mut summary,
        )
        .await?;
        if !finished {
            summary.cancelled = true;
            break;
        }
        summary.posts_written += 1;
    }

    if summary.cancelled {
        log_line(sink, "中断しました".to_string());
    } else if summary.failed_files > 0 {
        log_line(sink, format!("完了 ({}件のダウンロードに失敗)", summary.failed_files));
    } else {
        log_line(sink, "完了".to_string());
    }
    Ok(summary)
}

struct FileProgress {
    total: usize,
    started: Instant,
}

/// Returns `false` when cancellation was observed part way through.
#[allow(clippy::too_many_arguments)]
async fn write_post(
    dir: &str,
    post: &PostEntry,
    writer: &mut dyn ArchiveWriter,
    fetcher: &dyn FileFetcher,
    settings: &ArchiveSettings,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
    progress: &FileProgress,
    summary: &mut ArchiveSummary,
) -> Result<bool, ArchiveError> {
    let info = information_file(post.information.format, &post.information.text);
    writer.add_file(&format!("{dir}/{}", info.name), info.content.as_bytes())?;
    writer.add_file(&format!("{dir}/index.html"), post_page(post).as_bytes())?;

    if let Some(cover) = &post.cover {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        log_line(sink, format!("download {}", cover.encoded_name));
        match fetch_with_retry(fetcher, &cover.url, &cover.encoded_name, &settings.retry).await {
            Some(_) if cancel.is_cancelled() => return Ok(false),
            Some(bytes) => writer.add_file(&format!("{dir}/{}", cover.encoded_name), &bytes)?,
            None => engine_debug!("Cover of {} unavailable", post.id),
        }
    }

    let count = post.files.len();
    for (index, file) in post.files.iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        log_line(sink, format!("download {} ({}/{})", file.encoded_name, index + 1, count));
        match fetch_with_retry(fetcher, &file.url, &file.encoded_name, &settings.retry).await {
            Some(_) if cancel.is_cancelled() => return Ok(false),
            Some(bytes) => writer.add_file(&format!("{dir}/{}", file.encoded_name), &bytes)?,
            None => {
                summary.failed_files += 1;
                engine_error!("Failed to download {} from {}", file.encoded_name, file.url);
                log_line(sink, format!("{}のダウンロードに失敗", file.encoded_name));
            }
        }

        summary.completed_files += 1;
        let elapsed = progress.started.elapsed().as_secs();
        sink.emit(EngineEvent::RemainingTime(format_remaining(
            elapsed,
            progress.total,
            summary.completed_files,
        )));
        sink.emit(EngineEvent::Archiving {
            percent: progress_percent(summary.completed_files, progress.total),
        });
        tokio::time::sleep(settings.file_delay).await;
    }
    Ok(true)
}

/// Remaining time as `H:MM`, extrapolated from the average time per file.
/// Minutes are rounded up.
pub fn format_remaining(elapsed_secs: u64, total: usize, completed: usize) -> String {
    if completed == 0 {
        return "0:00".to_string();
    }
    let remaining_files = total.saturating_sub(completed) as u64;
    let remain = elapsed_secs * remaining_files / completed as u64;
    let hours = remain / 3600;
    let minutes = (remain - hours * 3600).div_ceil(60);
    format!("{hours}:{minutes:02}")
}

pub fn progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (completed * 100 / total) as u32
}
