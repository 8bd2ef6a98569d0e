//! The per-run results line appended to the benchmark file.

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use crate::config::Config;

#[derive(Serialize)]
struct ResultsRecord<'a> {
    mode: &'a str,
    threads: usize,
    #[serde(rename = "timeElapsed")]
    time_elapsed: f64,
    #[serde(rename = "timeParallel")]
    time_parallel: f64,
    datadir: &'a str,
}

/// The `mode` field: the CLI spelling, with `_<subThreads>[_<chunkSize>]`
/// appended for the pipelined modes so benchmark rows stay distinguishable.
pub fn mode_label(config: &Config) -> String {
    if !config.mode.is_pipelined() {
        return config.mode.label().to_string();
    }
    let mut label = format!("{}_{}", config.mode.label(), config.sub_threads);
    if config.chunk_size > 0 {
        label.push_str(&format!("_{}", config.chunk_size));
    }
    label
}

/// Append one JSON line for this run, creating the file (and its parent
/// directory) on first use.
pub fn append(
    config: &Config,
    threads: usize,
    elapsed: Duration,
    parallel: Duration,
) -> anyhow::Result<()> {
    let path = &config.paths.results_file;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let label = mode_label(config);
    let record = ResultsRecord {
        mode: &label,
        threads,
        time_elapsed: elapsed.as_secs_f64(),
        time_parallel: parallel.as_secs_f64(),
        datadir: &config.data_dirs,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "{}", serde_json::to_string(&record)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
