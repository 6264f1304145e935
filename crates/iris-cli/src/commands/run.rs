use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use iris_core::config::RunConfig;
use iris_core::context::RunContext;
use iris_core::frame::Camera;
use iris_core::remote::{send_to_port, RemoteCommand};
use iris_core::stats::{self, IngestStage, ProgressReporter};

use crate::summary::{print_outcome, print_run_summary, print_stats};

#[derive(Args)]
pub struct RunArgs {
    /// Raw dual-camera exposure (FITS)
    pub image: PathBuf,

    /// Make this exposure the new reference
    #[arg(long)]
    pub refresh: bool,

    /// Tell a listening viewer to reload the merged cube
    #[arg(long)]
    pub notify: bool,
}

/// Spinner showing the current ingestion stage.
struct SpinnerReporter {
    pb: Mutex<Option<ProgressBar>>,
}

impl SpinnerReporter {
    fn new() -> Self {
        Self {
            pb: Mutex::new(None),
        }
    }
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: IngestStage, total_items: Option<usize>) {
        let pb = match total_items {
            Some(n) => {
                let pb = ProgressBar::new(n as u64);
                if let Ok(style) = ProgressStyle::default_bar().template("{msg:20} [{bar:30}] {pos}/{len}") {
                    pb.set_style(style.progress_chars("=> "));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
        };
        pb.set_message(stage.to_string());
        if let Ok(mut slot) = self.pb.lock() {
            *slot = Some(pb);
        }
    }

    fn advance(&self, items_done: usize) {
        if let Ok(slot) = self.pb.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position(items_done as u64);
            }
        }
    }

    fn finish_stage(&self) {
        if let Ok(mut slot) = self.pb.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}

pub fn run(args: &RunArgs, config: RunConfig) -> Result<()> {
    print_run_summary(&config, &args.image, args.refresh);
    let port = config.daemon_port;
    let ctx = RunContext::new(config);

    let outcome = stats::ingest_reported(
        &ctx,
        &args.image,
        args.refresh,
        Arc::new(SpinnerReporter::new()),
    )
    .with_context(|| format!("Failed to ingest {}", args.image.display()))?;
    print_outcome(&outcome);

    let record = stats::summarize(&ctx, outcome.odometer)
        .with_context(|| format!("Failed to compute statistics of {}", outcome.odometer))?;
    stats::persist(&ctx, &record).with_context(|| {
        format!(
            "Failed to store statistics in {}",
            ctx.store().path().display()
        )
    })?;
    print_stats(&record);

    if args.notify {
        let cube = ctx.cubes().path(Camera::Merged);
        let cube = std::fs::canonicalize(&cube).unwrap_or(cube);
        send_to_port(port, &RemoteCommand::Update(cube).to_message())
            .with_context(|| format!("Failed to notify listener on port {}", port))?;
    }
    Ok(())
}
