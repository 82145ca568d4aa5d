//! Frame acquisition loop.
//!
//! Pulls a bounded, time-paced sequence of frames from a [`FrameSource`]:
//! the first `skip_frames` successful reads are discarded so the sensor can
//! stabilize, every later frame is appended in order, and reads are paced to
//! the target frame rate. The loop stops when the accepted count reaches
//! `max_frames`, the cancellation token trips, the producer closes its
//! stream, or a read fails, whichever comes first.
//!
//! The loop never discards what it has accumulated: every exit path returns a
//! [`Capture`] carrying the buffer, so the finalization step always runs over
//! whatever was accepted.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::CaptureConfig;
use crate::frame::FrameBuffer;
use crate::ingest::FrameSource;

/// Cooperative cancellation flag, checked between read and sleep steps.
///
/// A blocking read in progress is not interrupted; the loop notices the flag
/// on its next pass. A reader that stalls mid-read therefore stalls the loop,
/// which is an accepted limitation of the pipe protocol.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// How a capture ended.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Accepted-frame count reached the configured maximum.
    Completed,
    /// The cancellation token tripped before the capture filled.
    Cancelled,
    /// The producer closed its stream before the capture filled.
    ProducerExited,
    /// A read failed (I/O error or truncated frame).
    Failed(anyhow::Error),
}

/// A finished capture: the accepted frames plus how the loop ended.
pub struct Capture {
    pub frames: FrameBuffer,
    pub outcome: CaptureOutcome,
}

impl Capture {
    /// Map the outcome to a process-level result. Cancellation is a normal
    /// stop, not an error; an early producer exit is an error.
    pub fn into_result(self) -> Result<()> {
        match self.outcome {
            CaptureOutcome::Completed | CaptureOutcome::Cancelled => Ok(()),
            CaptureOutcome::ProducerExited => Err(anyhow!(
                "capture reader exited early after {} accepted frames",
                self.frames.len()
            )),
            CaptureOutcome::Failed(e) => Err(e),
        }
    }
}

/// Run the acquisition loop to completion.
///
/// `on_accept` is invoked with the running accepted count after each append,
/// so the caller can drive progress reporting without touching the loop.
pub fn run<S: FrameSource + ?Sized>(
    config: &CaptureConfig,
    source: &mut S,
    cancel: &CancelToken,
    mut on_accept: impl FnMut(usize),
) -> Capture {
    let interval = config.frame_interval();
    let mut frames = FrameBuffer::with_limit(config.max_frames);
    let mut skipped = 0u32;

    let outcome = loop {
        if cancel.is_cancelled() {
            log::info!("capture cancelled after {} frames", frames.len());
            break CaptureOutcome::Cancelled;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::warn!(
                    "capture reader closed its stream after {} accepted frames",
                    frames.len()
                );
                break CaptureOutcome::ProducerExited;
            }
            Err(e) => break CaptureOutcome::Failed(e),
        };

        if skipped < config.skip_frames {
            skipped += 1;
            log::debug!("skipping warm-up frame {}/{}", skipped, config.skip_frames);
            thread::sleep(interval);
            continue;
        }

        if let Err(e) = frames.push(frame) {
            break CaptureOutcome::Failed(e);
        }
        log::info!("frames: {}", frames.len());
        on_accept(frames.len());

        if frames.is_full() {
            break CaptureOutcome::Completed;
        }
        thread::sleep(interval);
    };

    Capture { frames, outcome }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
