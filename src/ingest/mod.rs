//! Frame ingestion.
//!
//! This module owns the producer side of a capture:
//! - Spawning the MLX90640 reader process and reading frames off its stdout
//! - A `stub://` synthetic source for tests and hardware-free runs
//!
//! The ingestion layer is responsible for:
//! - The child process lifecycle (spawn, kill, reap, stderr drain)
//! - Frame boundary discipline (a pipe read may return a partial frame;
//!   reassembly happens here and nowhere else)
//!
//! The ingestion layer does NOT pace reads or count accepted frames; that is
//! the acquisition loop's job.

use anyhow::Result;

use crate::frame::Frame;

mod reader;

pub use reader::{ReaderConfig, ReaderSource, ReaderStats};

/// A source of fixed-size sensor frames.
///
/// `Ok(Some(frame))` is one complete frame; `Ok(None)` is a clean end of
/// stream. The acquisition loop only sees this trait, so tests can script
/// their own sources.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
