//! FANBOX engine: API access, file downloads, collection runs and archive output.
mod api;
mod archive;
mod collect;
mod engine;
mod fetch;
mod persist;
mod render;
mod types;

pub use api::{ApiError, FanboxApi, ReqwestApi, DEFAULT_API_BASE};
pub use archive::{
    emit_archive, format_remaining, progress_percent, ArchiveError, ArchiveSettings,
    ArchiveSummary, ArchiveWriter, DEFAULT_FILE_DELAY,
};
pub use collect::{collect, CollectError, CollectSettings, DEFAULT_RATE_LIMIT};
pub use engine::{run_page, Clock, EngineConfig, EngineError, EngineHandle};
pub use fetch::{
    fetch_with_retry, ChannelProgressSink, FetchSettings, FileFetcher, ProgressSink,
    ReqwestFetcher, RetryPolicy,
};
pub use persist::{ensure_output_dir, PersistError, ZipArchiveWriter};
pub use render::{index_page, post_page};
pub use types::{EngineEvent, FailureKind, FetchError, RunSummary};
