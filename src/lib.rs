//! Bounded frame capture for the MLX90640 thermal camera reader.
//!
//! The reader is an external binary with privileged sensor access that
//! streams raw float32 measurement frames (768 values, 3072 bytes) on its
//! stdout at a requested frame rate. This crate owns everything on the
//! consuming side of that pipe:
//!
//! - `config`: defaults / TOML file / env / CLI resolution and validation
//! - `frame`: the fixed-size `Frame` and the bounded, append-only `FrameBuffer`
//! - `ingest`: the reader process lifecycle, frame boundary discipline, and a
//!   `stub://` synthetic source
//! - `capture`: the acquisition loop (skip policy, pacing, cancellation,
//!   termination)
//! - `report`: the always-run finalization step (count + raw frame dump)
//! - `ui`: progress reporting on stderr
//!
//! The `mlxcap` binary wires these together.

pub mod capture;
pub mod config;
pub mod frame;
pub mod ingest;
pub mod report;
pub mod ui;

pub use capture::{CancelToken, Capture, CaptureOutcome};
pub use config::{CaptureConfig, CaptureOverrides, SUPPORTED_FRAME_RATES};
pub use frame::{Frame, FrameBuffer, FRAME_BYTES, FRAME_PIXELS};
pub use ingest::{FrameSource, ReaderConfig, ReaderSource, ReaderStats};
