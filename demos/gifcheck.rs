//! This example validates a GIF file and optionally writes a repaired copy.
//!
//! Basic usage: `cargo run --example gifcheck -- --gif FILE`
//!
//! Pass `--reprocess` to re-read early trailers as graphic blocks and `--output FILE` to write
//! the patched file. More usage and arguments can be listed with `--help`.

use clap::Parser;
use gifcheck::{validate, Config, GifReport};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};

#[derive(Parser)]
struct Args {
    /// Path to GIF file to open.
    #[clap(long)]
    gif: PathBuf,

    /// Always re-interpret early trailers as Graphic Blocks.
    #[clap(long)]
    reprocess: bool,

    /// File to write patched file to.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Log level, 0 is the most verbose.
    #[clap(short = 'l', default_value = "2")]
    log_level: u8,
}

fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::DEBUG,
        1 => LevelFilter::INFO,
        2 => LevelFilter::WARN,
        _ => LevelFilter::ERROR,
    }
}

/// Run the file through a full decoder first, like any viewer would.
fn decode_all(data: &[u8]) -> Result<usize, gif::DecodingError> {
    let mut decoder = gif::DecodeOptions::new().read_info(data)?;
    let mut frames = 0;
    while decoder.read_next_frame()?.is_some() {
        frames += 1;
    }
    Ok(frames)
}

fn summarize(report: &GifReport) {
    info!(
        version = %report.version,
        graphic_blocks = report.graphic_blocks,
        special_purpose_blocks = report.special_purpose_blocks,
        final_offset = report.final_offset,
        "structure is valid"
    );
    if report.outstanding_byte_count > 0 {
        warn!(
            outstanding = report.outstanding_byte_count,
            "bytes after the trailer, there may be hidden frames"
        );
    }
    for patch in &report.patches {
        warn!(
            index = patch.index,
            old = patch.old_value,
            new = patch.new_value,
            "forged trailer"
        );
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = level_filter(args.log_level);
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .without_time()
        .init();

    let data = match fs::read(&args.gif) {
        Ok(data) => data,
        Err(e) => {
            error!("Open: {}: {}", args.gif.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match decode_all(&data) {
        Ok(frames) => info!(frames, "decoder read the file"),
        Err(e) => error!("gif decoder: {e}"),
    }

    let config = Config::default()
        .with_recovery(args.reprocess)
        .with_corrected_output(args.output.is_some())
        .with_log_level(log_level);

    let report = match validate(&data, &config) {
        Ok(report) => report,
        Err(e) => {
            error!("invalid gif: {e}");
            return ExitCode::FAILURE;
        }
    };
    summarize(&report);

    if let (Some(path), Some(corrected)) = (&args.output, &report.corrected) {
        for stale in &report.skipped_patches {
            warn!("{stale}");
        }
        if let Err(e) = fs::write(path, corrected) {
            error!("failed writing output file: {e}");
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), "wrote patched file");
    }

    ExitCode::SUCCESS
}
