//! Mode dispatch: build the job list, run the selected scheme, record the
//! results line.

mod parfiles;
mod parslices;
mod pipe_bsp;
mod pipeline;
mod sequential;
mod tasks;

use std::time::Instant;

use anyhow::Context;
use log::{info, warn};

use crate::config::{Config, Mode};
use crate::jobs;
use crate::results;

/// Run one batch under `config` and append its results line.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();

    let jobs = jobs::load_jobs(config)?;
    info!(
        "{} jobs from {:?} in mode {}",
        jobs.len(),
        config.data_dirs,
        config.mode.label()
    );
    std::fs::create_dir_all(&config.paths.output_root)
        .with_context(|| format!("creating {}", config.paths.output_root.display()))?;

    let threads = match config.mode {
        Mode::Sequential => 1,
        // No point spinning up more workers than there are images.
        _ => config.thread_count.clamp(1, jobs.len().max(1)),
    };

    let parallel = match config.mode {
        Mode::Sequential => sequential::run(config, jobs)?,
        Mode::ParFiles => parfiles::run(jobs, threads),
        Mode::ParSlices => parslices::run(jobs, threads),
        Mode::PipeBsp => pipe_bsp::run(config, jobs, threads),
        Mode::PipeBspWs => pipeline::run_sharded(config, jobs, threads, true),
        Mode::PipeBspWsCompare => pipeline::run_sharded(config, jobs, threads, false),
    };

    let elapsed = start.elapsed();
    if let Err(err) = results::append(config, threads, elapsed, parallel) {
        warn!("failed to record results: {err:#}");
    }
    Ok(())
}
