//! Baseline: one image at a time on the calling thread.

use std::time::Duration;

use anyhow::Context;
use log::warn;
use pixel_effects::Image;

use crate::config::Config;
use crate::jobs::Job;

/// Returns the parallel-section time, which for this mode is zero.
pub(crate) fn run(_config: &Config, jobs: Vec<Job>) -> anyhow::Result<Duration> {
    for job in jobs {
        let img = Image::load(&job.in_path)
            .with_context(|| format!("loading {}", job.in_path.display()))?;
        for &effect in &job.effects {
            img.apply(effect);
            img.flip();
        }
        if let Err(err) = img.save(&job.out_path) {
            warn!("failed to save {}: {err}", job.out_path.display());
        }
    }
    Ok(Duration::ZERO)
}
