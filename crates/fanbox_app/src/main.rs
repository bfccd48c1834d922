//! fanbox-dl: archives a FANBOX creator or a single post into a zip file.

mod logging;
mod progress;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use engine_logging::{engine_error, engine_info, engine_warn};
use fanbox_core::{detect_page, MetadataFormat};
use fanbox_engine::{EngineHandle, RunSummary};
use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use progress::RunProgress;
use settings::{Overrides, Settings, DEFAULT_SETTINGS_FILE};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "fanbox-dl")]
#[command(about = "Download a FANBOX creator's posts into a browsable zip archive")]
struct Args {
    /// Creator (`https://www.fanbox.cc/@name`) or post URL
    url: String,

    /// Directory the archive is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many accepted posts
    #[arg(short, long)]
    limit: Option<u32>,

    /// Skip posts that are free to view
    #[arg(long)]
    ignore_free: bool,

    /// Format of each post's information file
    #[arg(long, value_enum)]
    metadata: Option<MetadataArg>,

    /// Value of the FANBOXSESSID cookie
    #[arg(long)]
    session: Option<String>,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Also show info-level log lines on the terminal
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MetadataArg {
    Text,
    Json,
}

impl From<MetadataArg> for MetadataFormat {
    fn from(arg: MetadataArg) -> Self {
        match arg {
            MetadataArg::Text => MetadataFormat::KeyValue,
            MetadataArg::Json => MetadataFormat::Json,
        }
    }
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            output_dir: self.output.clone(),
            session_id: self.session.clone(),
            ignore_free: self.ignore_free,
            limit: self.limit,
            metadata_format: self.metadata.map(MetadataFormat::from),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::initialize(if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    });

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let page = detect_page(&args.url)
        .ok_or_else(|| anyhow!("not a FANBOX creator or post URL: {}", args.url))?;
    engine_info!("Archiving {:?}", page);

    let mut settings = Settings::load(&args.config);
    settings.apply(args.overrides());
    let config = settings.engine_config(Arc::new(|| Utc::now().to_rfc3339()));

    let handle = EngineHandle::new(config);
    watch_interrupt(handle.cancel_token()).context("failed to install the Ctrl-C handler")?;
    handle.run(page);

    let mut progress = RunProgress::new();
    while let Some(event) = handle.recv() {
        if let Some(result) = progress.apply(event) {
            return finish(result.map_err(|message| anyhow!(message)));
        }
    }
    progress.abandon();
    bail!("the engine stopped before the run completed")
}

fn finish(result: anyhow::Result<RunSummary>) -> anyhow::Result<ExitCode> {
    let summary = result?;
    if summary.cancelled {
        engine_warn!("Run cancelled");
        println!("中断しました");
        return Ok(ExitCode::from(130));
    }
    if let Some(path) = summary.archive_path {
        println!(
            "{} ({}件, ファイル{}件)",
            path.display(),
            summary.post_count,
            summary.file_count
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Cancels `token` on Ctrl-C. The current request finishes, then the archive is closed.
fn watch_interrupt(token: CancellationToken) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("Interrupted, stopping after the current request");
                token.cancel();
            }
        });
    });
    Ok(())
}
