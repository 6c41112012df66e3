//! hotpipe - copy stdin to a file, dropping lines repeated within a TTL

mod config;
mod pipe;

use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::config::PipeConfig;
use crate::pipe::Pipe;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Writer buffer size in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Number of distinct recent lines remembered
    #[arg(long)]
    dedup_capacity: Option<usize>,

    /// Idle time in milliseconds before a remembered line is forgotten
    #[arg(long)]
    dedup_ttl_ms: Option<u64>,
}

impl Args {
    fn resolve(&self) -> Result<PipeConfig> {
        let mut config = match &self.config {
            Some(path) => PipeConfig::load(path)?,
            None => PipeConfig::default(),
        };

        if let Some(size) = self.buffer_size {
            config.writer.buffer_capacity = size;
        }
        if let Some(capacity) = self.dedup_capacity {
            config.dedup.max_entries = capacity;
        }
        if let Some(ttl) = self.dedup_ttl_ms {
            config.dedup.ttl_ms = ttl;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.resolve()?;

    info!("Starting hotpipe v{}", env!("CARGO_PKG_VERSION"));
    info!("Output: {}", args.output.display());
    info!(
        "Buffer size: {} bytes, dedup: {} lines / {} ms",
        config.writer.buffer_capacity, config.dedup.max_entries, config.dedup.ttl_ms
    );

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let pipe = Pipe::new(file, &config)?;

    let (_file, summary) = pipe.run(io::stdin().lock())?;

    info!(
        lines_in = summary.lines_in,
        lines_written = summary.lines_written,
        duplicates = summary.duplicates,
        bytes_out = summary.bytes_out,
        "pipe finished"
    );
    info!(
        allocated = summary.buffers_allocated,
        reused = summary.buffers_reused,
        dedup_hit_ratio = summary.dedup_hit_ratio,
        "buffer and cache usage"
    );

    Ok(())
}
