//! Effect-descriptor parsing and the shared job queue.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use pixel_effects::Effect;
use serde::Deserialize;

use crate::config::Config;

/// One line of the descriptor file, as written on disk.
#[derive(Debug, Deserialize)]
struct DescriptorLine {
    #[serde(rename = "inPath")]
    in_path: String,
    #[serde(rename = "outPath")]
    out_path: String,
    effects: Vec<String>,
}

/// One image to process: resolved paths plus the validated effect list.
#[derive(Debug, Clone)]
pub struct Job {
    pub in_path: PathBuf,
    pub out_path: PathBuf,
    pub effects: Vec<Effect>,
}

/// Cross the descriptor file with the `+`-separated data directories:
/// one job per (directory × line) pair, inputs under
/// `<input_root>/<dir>/<inPath>`, outputs at `<output_root>/<dir>_<outPath>`.
///
/// Fails on unreadable descriptor files, malformed JSON, and unknown effect
/// codes. These are all startup errors; nothing here is recoverable
/// mid-batch.
pub fn load_jobs(config: &Config) -> anyhow::Result<Vec<Job>> {
    let path = &config.paths.effects_file;
    let file = File::open(path)
        .with_context(|| format!("opening effects descriptor {}", path.display()))?;

    let dirs: Vec<&str> = config.data_dirs.split('+').collect();
    let mut jobs = Vec::new();

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: DescriptorLine = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed descriptor", path.display(), lineno + 1))?;
        let effects: Vec<Effect> = parsed
            .effects
            .iter()
            .map(|code| Effect::from_code(code))
            .collect::<Result<_, _>>()
            .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;

        for dir in &dirs {
            jobs.push(Job {
                in_path: config.paths.input_root.join(dir).join(&parsed.in_path),
                out_path: config
                    .paths
                    .output_root
                    .join(format!("{dir}_{}", parsed.out_path)),
                effects: effects.clone(),
            });
        }
    }
    Ok(jobs)
}

/// Shared FIFO of jobs for the whole-image parallel mode.
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new(jobs: Vec<Job>) -> Self {
        JobQueue {
            jobs: Mutex::new(jobs.into()),
        }
    }

    /// Take the next job, or `None` when the batch is exhausted.
    pub fn next(&self) -> Option<Job> {
        self.jobs.lock().unwrap().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataPaths, Mode};
    use std::io::Write;

    fn config_with(effects_file: PathBuf, data_dirs: &str) -> Config {
        Config {
            data_dirs: data_dirs.to_string(),
            mode: Mode::Sequential,
            thread_count: 1,
            sub_threads: 1,
            chunk_size: 0,
            paths: DataPaths {
                effects_file,
                input_root: PathBuf::from("/in"),
                output_root: PathBuf::from("/out"),
                results_file: PathBuf::from("/results.txt"),
            },
        }
    }

    #[test]
    fn crosses_directories_with_lines() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = dir.path().join("effects.txt");
        let mut file = File::create(&descriptor).unwrap();
        writeln!(
            file,
            r#"{{"inPath": "a.png", "outPath": "a_out.png", "effects": ["G", "B"]}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"inPath": "b.png", "outPath": "b_out.png", "effects": ["S"]}}"#
        )
        .unwrap();

        let jobs = load_jobs(&config_with(descriptor, "small+big")).unwrap();
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[0].in_path, PathBuf::from("/in/small/a.png"));
        assert_eq!(jobs[1].in_path, PathBuf::from("/in/big/a.png"));
        assert_eq!(jobs[1].out_path, PathBuf::from("/out/big_a_out.png"));
        assert_eq!(jobs[0].effects, vec![Effect::Grayscale, Effect::Blur]);
        assert_eq!(jobs[2].effects, vec![Effect::Sharpen]);
    }

    #[test]
    fn unknown_effect_code_fails_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = dir.path().join("effects.txt");
        std::fs::write(
            &descriptor,
            r#"{"inPath": "a.png", "outPath": "o.png", "effects": ["Q"]}"#,
        )
        .unwrap();
        assert!(load_jobs(&config_with(descriptor, "d")).is_err());
    }

    #[test]
    fn missing_descriptor_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_jobs(&config_with(dir.path().join("absent.txt"), "d")).is_err());
    }

    #[test]
    fn job_queue_drains_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = dir.path().join("effects.txt");
        std::fs::write(
            &descriptor,
            r#"{"inPath": "a.png", "outPath": "o.png", "effects": ["G"]}"#,
        )
        .unwrap();
        let jobs = load_jobs(&config_with(descriptor, "x+y")).unwrap();
        let queue = JobQueue::new(jobs);
        assert_eq!(queue.next().unwrap().in_path, PathBuf::from("/in/x/a.png"));
        assert_eq!(queue.next().unwrap().in_path, PathBuf::from("/in/y/a.png"));
        assert!(queue.next().is_none());
    }
}
