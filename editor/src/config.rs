//! Run configuration.

use std::path::PathBuf;

use clap::ValueEnum;

/// Scheduling scheme, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// One image at a time on the calling thread.
    #[value(name = "s")]
    Sequential,
    /// Whole images processed in parallel off a shared locked queue.
    #[value(name = "parfiles")]
    ParFiles,
    /// One image at a time, its rows sliced across threads per effect.
    #[value(name = "parslices")]
    ParSlices,
    /// Three-stage pipeline, plain channel consumers.
    #[value(name = "pipebsp")]
    PipeBsp,
    /// Three-stage pipeline, work-stealing workers.
    #[value(name = "pipebspws")]
    PipeBspWs,
    /// `pipebspws` with stealing disabled, for benchmarking comparisons.
    #[value(name = "pipebspwscompare")]
    PipeBspWsCompare,
}

impl Mode {
    /// The command-line spelling, used as the base of the results label.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Sequential => "s",
            Mode::ParFiles => "parfiles",
            Mode::ParSlices => "parslices",
            Mode::PipeBsp => "pipebsp",
            Mode::PipeBspWs => "pipebspws",
            Mode::PipeBspWsCompare => "pipebspwscompare",
        }
    }

    /// Whether this mode takes the `_<subThreads>[_<chunk>]` label suffix
    /// and honors `sub_threads` / `chunk_size`.
    pub fn is_pipelined(&self) -> bool {
        matches!(self, Mode::PipeBsp | Mode::PipeBspWs | Mode::PipeBspWsCompare)
    }
}

/// Filesystem layout for a run. Defaults match the on-disk conventions
/// (`./data`, `./benchmark`); tests point these at temp directories.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Effect descriptor file, one JSON object per line.
    pub effects_file: PathBuf,
    /// Root of the input directories named by `data_dirs`.
    pub input_root: PathBuf,
    /// Directory receiving `<dir>_<outPath>` files.
    pub output_root: PathBuf,
    /// Results file, appended one JSON line per run.
    pub results_file: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            effects_file: PathBuf::from("./data/effects.txt"),
            input_root: PathBuf::from("./data/in"),
            output_root: PathBuf::from("./data/out"),
            results_file: PathBuf::from("./benchmark/results.txt"),
        }
    }
}

/// Everything a run needs, snapshotted before any worker starts.
#[derive(Debug, Clone)]
pub struct Config {
    /// Plus-separated input directory list, e.g. `small+big`.
    pub data_dirs: String,
    pub mode: Mode,
    /// Worker threads per phase (clamped to the task count at run time).
    pub thread_count: usize,
    /// Sub-workers slicing each image in the pipelined modes; 1 disables
    /// slicing.
    pub sub_threads: usize,
    /// Images per pipeline chunk; 0 means one chunk holding everything.
    pub chunk_size: usize,
    pub paths: DataPaths,
}
