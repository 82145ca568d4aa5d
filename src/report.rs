//! Capture finalization.
//!
//! Runs on every exit path, whatever ended the loop: logs the total accepted
//! count and, when more than one frame was accepted, dumps each accepted
//! frame's raw bytes to the sink in capture order.

use anyhow::{Context, Result};
use std::io::Write;

use crate::capture::Capture;
use crate::frame::Frame;

pub fn finalize<W: Write>(capture: &Capture, out: &mut W) -> Result<()> {
    let count = capture.frames.len();
    log::info!("caught {} frames", count);

    if count > 1 {
        for (index, frame) in capture.frames.iter().enumerate() {
            if let Some((min, max)) = temperature_span(frame) {
                log::debug!("frame {}: {:.1}C..{:.1}C", index, min, max);
            }
            out.write_all(frame.as_bytes())
                .context("failed to write frame dump")?;
        }
        out.flush().context("failed to flush frame dump")?;
    }
    Ok(())
}

/// Min/max of the finite measurements, if there are any.
fn temperature_span(frame: &Frame) -> Option<(f32, f32)> {
    frame.temperatures().filter(|t| t.is_finite()).fold(
        None,
        |span, t| match span {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        },
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureOutcome;
    use crate::frame::{FrameBuffer, FRAME_BYTES};

    fn capture_with(fills: &[u8]) -> Capture {
        let mut frames = FrameBuffer::with_limit(fills.len().max(1));
        for &fill in fills {
            frames
                .push(Frame::from_bytes(vec![fill; FRAME_BYTES]).unwrap())
                .unwrap();
        }
        Capture {
            frames,
            outcome: CaptureOutcome::Completed,
        }
    }

    #[test]
    fn empty_capture_dumps_nothing() {
        let mut sink = Vec::new();
        finalize(&capture_with(&[]), &mut sink).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn single_frame_dumps_nothing() {
        let mut sink = Vec::new();
        finalize(&capture_with(&[7]), &mut sink).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn multiple_frames_dump_in_order() {
        let mut sink = Vec::new();
        finalize(&capture_with(&[1, 2, 3]), &mut sink).unwrap();

        assert_eq!(sink.len(), 3 * FRAME_BYTES);
        assert_eq!(&sink[..FRAME_BYTES], &vec![1u8; FRAME_BYTES][..]);
        assert_eq!(
            &sink[FRAME_BYTES..2 * FRAME_BYTES],
            &vec![2u8; FRAME_BYTES][..]
        );
        assert_eq!(&sink[2 * FRAME_BYTES..], &vec![3u8; FRAME_BYTES][..]);
    }

    #[test]
    fn temperature_span_skips_non_finite_values() {
        let mut data = Vec::with_capacity(FRAME_BYTES);
        data.extend_from_slice(&f32::NAN.to_le_bytes());
        data.extend_from_slice(&19.5f32.to_le_bytes());
        data.extend_from_slice(&36.0f32.to_le_bytes());
        while data.len() < FRAME_BYTES {
            data.extend_from_slice(&20.0f32.to_le_bytes());
        }
        let frame = Frame::from_bytes(data).unwrap();

        assert_eq!(temperature_span(&frame), Some((19.5, 36.0)));
    }
}
