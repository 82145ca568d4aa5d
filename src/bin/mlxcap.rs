//! mlxcap - bounded MLX90640 frame capture.
//!
//! This tool:
//! 1. Resolves capture settings (flags, env, optional TOML config file)
//! 2. Spawns the rawrgb reader with the target frame rate
//! 3. Skips warm-up frames, then captures a bounded, paced frame sequence
//! 4. Stops on the frame target or Ctrl-C, whichever comes first
//! 5. Reports the capture and dumps the raw frames to stdout

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use mlx_capture::ui::Ui;
use mlx_capture::{
    capture, report, CancelToken, CaptureConfig, CaptureOverrides, ReaderConfig, ReaderSource,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture a bounded run of MLX90640 thermal frames"
)]
struct Args {
    /// Number of frames to capture. Default: 50.
    #[arg(long)]
    frames: Option<usize>,

    /// Framerate to capture at (1, 2, 4, 8, 16, 32 or 64). Default: 4.
    #[arg(long)]
    fps: Option<u32>,

    /// Frames to skip before recording begins. Default: 2.
    #[arg(long)]
    skip: Option<u32>,

    /// Path to the reader executable, or stub://gradient for a synthetic
    /// source.
    #[arg(long)]
    reader: Option<PathBuf>,

    /// Optional TOML config file.
    #[arg(long, env = "MLXCAP_CONFIG")]
    config: Option<PathBuf>,

    /// Run the reader directly instead of through sudo.
    #[arg(long)]
    no_elevate: bool,

    /// Progress style: auto, plain or pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = CaptureConfig::load(&CaptureOverrides {
        config_path: args.config.clone(),
        reader_path: args.reader.clone(),
        fps: args.fps,
        max_frames: args.frames,
        skip_frames: args.skip,
        no_elevate: args.no_elevate,
    })?;

    log::info!(
        "capturing {} frames at {} fps (skipping {}) from {}",
        cfg.max_frames,
        cfg.fps,
        cfg.skip_frames,
        cfg.reader_path.display()
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install interrupt handler")?;

    let mut source = ReaderSource::new(ReaderConfig {
        path: cfg.reader_path.clone(),
        fps: cfg.fps,
        elevate: cfg.elevate,
    });
    source.connect()?;

    let ui = Ui::from_args(args.ui.as_deref(), std::io::stderr().is_terminal());
    let progress = ui.capture_progress(cfg.max_frames);

    let result = capture::run(&cfg, &mut source, &cancel, |accepted| {
        progress.set(accepted)
    });
    progress.finish();
    source.shutdown();

    let stats = source.stats();
    log::debug!(
        "reader delivered {} frames ({} bytes) from {}",
        stats.frames_read,
        stats.bytes_read,
        stats.source
    );

    let stdout = std::io::stdout();
    report::finalize(&result, &mut stdout.lock())?;
    result.into_result()
}
