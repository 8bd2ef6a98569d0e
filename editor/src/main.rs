//! Command-line entry point.

use std::time::Instant;

use clap::Parser;
use editor::config::{Config, DataPaths, Mode};
use editor::schedule;

/// Batch PNG editor: applies the effect chains in ./data/effects.txt to
/// every image under the named data directories.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Plus-separated subdirectories of ./data/in, e.g. "small+big"
    data_dirs: String,

    /// Scheduling scheme
    #[arg(value_enum, default_value = "s")]
    mode: Mode,

    /// Worker threads per phase; omitted means run sequentially
    thread_count: Option<usize>,

    /// Sub-workers slicing each image (pipebsp modes only)
    #[arg(default_value_t = 1)]
    sub_thread_count: usize,

    /// Images per pipeline chunk; 0 processes everything at once
    #[arg(default_value_t = 0)]
    chunk_size: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config {
        data_dirs: args.data_dirs,
        // A parallel mode without a thread count degenerates to sequential.
        mode: if args.thread_count.is_some() {
            args.mode
        } else {
            Mode::Sequential
        },
        thread_count: args.thread_count.unwrap_or(1),
        sub_threads: args.sub_thread_count.max(1),
        chunk_size: args.chunk_size,
        paths: DataPaths::default(),
    };

    let start = Instant::now();
    schedule::run(&config)?;
    println!("{:.2}", start.elapsed().as_secs_f64());
    Ok(())
}
