//! Capture configuration.
//!
//! Resolution order, lowest to highest precedence: built-in defaults, an
//! optional TOML config file, `MLXCAP_*` environment variables, CLI
//! overrides. Resolution is a pure function of those inputs; validation
//! happens once at the end, before any process is spawned.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frame rates the MLX90640 reader accepts as its argument.
pub const SUPPORTED_FRAME_RATES: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];

const DEFAULT_READER_PATH: &str = "./rawrgb";
const DEFAULT_FPS: u32 = 4;
const DEFAULT_MAX_FRAMES: usize = 50;
const DEFAULT_SKIP_FRAMES: u32 = 2;

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    reader_path: Option<PathBuf>,
    fps: Option<u32>,
    max_frames: Option<usize>,
    skip_frames: Option<u32>,
    elevate: Option<bool>,
}

/// CLI-sourced overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct CaptureOverrides {
    pub config_path: Option<PathBuf>,
    pub reader_path: Option<PathBuf>,
    pub fps: Option<u32>,
    pub max_frames: Option<usize>,
    pub skip_frames: Option<u32>,
    pub no_elevate: bool,
}

/// Resolved, validated capture settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Path to the reader executable, or a `stub://` source for
    /// hardware-free runs.
    pub reader_path: PathBuf,
    /// Target frames per second; also passed to the reader as its argument.
    pub fps: u32,
    /// Accepted frames to capture before stopping.
    pub max_frames: usize,
    /// Warm-up frames to read and discard before recording begins.
    pub skip_frames: u32,
    /// Spawn the reader through sudo (the sensor needs privileged I2C/GPIO
    /// access on deployment hardware).
    pub elevate: bool,
}

impl CaptureConfig {
    pub fn load(overrides: &CaptureOverrides) -> Result<Self> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var("MLXCAP_CONFIG").ok().map(PathBuf::from));
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(path)?,
            None => CaptureConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        Self {
            reader_path: file
                .reader_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_READER_PATH)),
            fps: file.fps.unwrap_or(DEFAULT_FPS),
            max_frames: file.max_frames.unwrap_or(DEFAULT_MAX_FRAMES),
            skip_frames: file.skip_frames.unwrap_or(DEFAULT_SKIP_FRAMES),
            elevate: file.elevate.unwrap_or(true),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("MLXCAP_READER") {
            if !path.trim().is_empty() {
                self.reader_path = PathBuf::from(path);
            }
        }
        if let Some(fps) = parse_env_int("MLXCAP_FPS")? {
            self.fps = fps;
        }
        if let Some(max_frames) = parse_env_int("MLXCAP_FRAMES")? {
            self.max_frames = max_frames;
        }
        if let Some(skip_frames) = parse_env_int("MLXCAP_SKIP")? {
            self.skip_frames = skip_frames;
        }
        if std::env::var("MLXCAP_NO_ELEVATE").is_ok() {
            self.elevate = false;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &CaptureOverrides) {
        if let Some(path) = &overrides.reader_path {
            self.reader_path = path.clone();
        }
        if let Some(fps) = overrides.fps {
            self.fps = fps;
        }
        if let Some(max_frames) = overrides.max_frames {
            self.max_frames = max_frames;
        }
        if let Some(skip_frames) = overrides.skip_frames {
            self.skip_frames = skip_frames;
        }
        if overrides.no_elevate {
            self.elevate = false;
        }
    }

    fn validate(&self) -> Result<()> {
        if !SUPPORTED_FRAME_RATES.contains(&self.fps) {
            return Err(anyhow!(
                "unsupported frame rate {} (the reader accepts {:?})",
                self.fps,
                SUPPORTED_FRAME_RATES
            ));
        }
        if self.max_frames == 0 {
            return Err(anyhow!("max frames must be greater than zero"));
        }
        if !self.uses_stub_reader() && !self.reader_path.is_file() {
            return Err(anyhow!(
                "capture reader {} doesn't exist, did you forget to run \"make\"?",
                self.reader_path.display()
            ));
        }
        Ok(())
    }

    /// Pacing interval between reads.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }

    pub fn uses_stub_reader(&self) -> bool {
        is_stub_path(&self.reader_path)
    }
}

pub(crate) fn is_stub_path(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.starts_with("stub://"))
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_env_int<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be an integer, got {:?}", key, raw))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}
