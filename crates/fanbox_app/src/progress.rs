//! Terminal progress for a run, driven by engine events.

use std::time::Duration;

use fanbox_engine::{EngineEvent, RunSummary};
use indicatif::{ProgressBar, ProgressStyle};

const COLLECT_TEMPLATE: &str = "{spinner:.cyan} {prefix} [{bar:40.cyan/dim}] {pos}/{len} {msg}";
const ARCHIVE_TEMPLATE: &str = "{spinner:.green} {prefix} [{bar:40.green/dim}] {pos}% {msg}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Starting,
    Collecting,
    Archiving,
}

/// One progress bar reused for the collecting and archiving phases.
pub struct RunProgress {
    bar: ProgressBar,
    phase: Phase,
}

impl RunProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            phase: Phase::Starting,
        }
    }

    /// Applies `event` to the bar. Returns the result once the run completed.
    pub fn apply(&mut self, event: EngineEvent) -> Option<Result<RunSummary, String>> {
        match event {
            EngineEvent::Log(line) => self.bar.println(line),
            EngineEvent::Collecting { current, total } => {
                self.enter(Phase::Collecting);
                self.bar.set_length(total.max(current) as u64);
                self.bar.set_position(current as u64);
            }
            EngineEvent::Archiving { percent } => {
                self.enter(Phase::Archiving);
                self.bar.set_position(u64::from(percent));
            }
            EngineEvent::RemainingTime(remaining) => {
                self.enter(Phase::Archiving);
                self.bar.set_message(format!("残り {remaining}"));
            }
            EngineEvent::RunCompleted { result } => {
                self.bar.finish_and_clear();
                return Some(result);
            }
        }
        None
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        let (template, prefix, length) = match phase {
            Phase::Collecting | Phase::Starting => (COLLECT_TEMPLATE, "収集中", 0),
            Phase::Archiving => (ARCHIVE_TEMPLATE, "保存中", 100),
        };
        self.bar.set_style(style(template));
        self.bar.set_prefix(prefix);
        self.bar.set_length(length);
        self.bar.set_position(0);
        self.bar.set_message("");
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}
