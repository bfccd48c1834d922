use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_error, engine_info};
use fanbox_core::{encode_file_name, PageKind};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{FanboxApi, ReqwestApi, DEFAULT_API_BASE};
use crate::archive::{emit_archive, ArchiveError, ArchiveSettings};
use crate::collect::{collect, CollectError, CollectSettings};
use crate::fetch::{ChannelProgressSink, FetchSettings, FileFetcher, ProgressSink, ReqwestFetcher};
use crate::persist::ZipArchiveWriter;
use crate::{EngineEvent, FetchError, RunSummary};

/// Produces the timestamp shown on the archive index page.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct EngineConfig {
    pub api_base: String,
    pub fetch: FetchSettings,
    pub collect: CollectSettings,
    pub archive: ArchiveSettings,
    pub output_dir: PathBuf,
    pub archived_utc: Clock,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            fetch: FetchSettings::default(),
            collect: CollectSettings::default(),
            archive: ArchiveSettings::default(),
            output_dir,
            archived_utc: Arc::new(String::new),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Client(#[from] FetchError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error("failed to serialize the download unit: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

enum EngineCommand {
    Run { page: PageKind },
}

/// Runs archive jobs one at a time on a background thread.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start the tokio runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                runtime.block_on(handle_command(&config, command, &event_tx, &token));
            }
        });

        Self {
            cmd_tx,
            event_rx,
            cancel,
        }
    }

    pub fn run(&self, page: PageKind) {
        let _ = self.cmd_tx.send(EngineCommand::Run { page });
    }

    /// Token shared with every run; cancelling it stops the current and all later runs.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Blocks for the next event. `None` once the engine thread has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    config: &EngineConfig,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
    cancel: &CancellationToken,
) {
    match command {
        EngineCommand::Run { page } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = match build_clients(config) {
                Ok((api, fetcher)) => {
                    run_page(config, &api, &fetcher, &page, &sink, cancel).await
                }
                Err(err) => Err(err),
            };
            let result = result.map_err(|err| {
                engine_error!("Run for {} failed: {}", page.creator_id(), err);
                err.to_string()
            });
            let _ = event_tx.send(EngineEvent::RunCompleted { result });
        }
    }
}

fn build_clients(config: &EngineConfig) -> Result<(ReqwestApi, ReqwestFetcher), EngineError> {
    let api = ReqwestApi::new(config.api_base.clone(), &config.fetch)?;
    let fetcher = ReqwestFetcher::new(&config.fetch)?;
    Ok((api, fetcher))
}

/// Collects `page` and archives it into `<output_dir>/<creator>.zip`.
///
/// A run cancelled during collection writes no archive.
pub async fn run_page(
    config: &EngineConfig,
    api: &dyn FanboxApi,
    fetcher: &dyn FileFetcher,
    page: &PageKind,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunSummary, EngineError> {
    engine_info!("Collecting {:?}", page);
    let unit = collect(api, page, &config.collect, sink, cancel).await?;
    if cancel.is_cancelled() {
        return Ok(RunSummary {
            archive_path: None,
            post_count: unit.post_count,
            file_count: unit.file_count,
            failed_files: 0,
            cancelled: true,
        });
    }

    let payload = serde_json::to_string(&unit)?;
    let file_name = format!("{}.zip", encode_file_name(&unit.id));
    let mut writer = ZipArchiveWriter::create(&config.output_dir, &file_name)?;
    let settings = ArchiveSettings {
        archived_at: Some((config.archived_utc)()),
        ..config.archive.clone()
    };
    let summary = emit_archive(&payload, &mut writer, fetcher, &settings, sink, cancel).await?;

    Ok(RunSummary {
        archive_path: Some(writer.path().to_path_buf()),
        post_count: summary.post_count,
        file_count: summary.file_count,
        failed_files: summary.failed_files,
        cancelled: summary.cancelled,
    })
}
