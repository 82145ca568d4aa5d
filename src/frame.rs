//! Frame model.
//!
//! The MLX90640 reader streams one fixed-size block per sensor readout:
//! 768 raw float32 measurements (a 32x24 grid), 3072 bytes. `Frame` holds
//! exactly one such block; `FrameBuffer` is the ordered, append-only
//! accumulator the acquisition loop fills up to its configured limit.

use anyhow::{anyhow, Result};

/// Measurements per frame (32x24 sensor grid).
pub const FRAME_PIXELS: usize = 768;

/// Bytes per frame: one f32 per measurement.
pub const FRAME_BYTES: usize = FRAME_PIXELS * 4;

/// One raw sensor readout, exactly [`FRAME_BYTES`] long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw byte block. Rejects anything that is not exactly one
    /// frame's worth of bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != FRAME_BYTES {
            return Err(anyhow!(
                "frame size mismatch: got {} bytes, expected {}",
                data.len(),
                FRAME_BYTES
            ));
        }
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Decode the measurements as little-endian f32 degrees Celsius.
    ///
    /// The reader binary writes native floats on little-endian Pi hardware.
    pub fn temperatures(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Ordered, append-only frame accumulator with a hard capacity.
///
/// The acquisition loop owns one of these for the duration of a capture and
/// hands it to the finalization step. Frames are never mutated or dropped
/// after append; `len() <= limit` holds at all times.
pub struct FrameBuffer {
    frames: Vec<Frame>,
    limit: usize,
}

impl FrameBuffer {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Append an accepted frame. Errors if the buffer is already full; the
    /// loop is expected to stop at `is_full()` instead of relying on this.
    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= self.limit {
            return Err(anyhow!(
                "frame buffer full ({} frames), refusing to append",
                self.limit
            ));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Total raw bytes held, for memory reporting.
    pub fn memory_bytes(&self) -> usize {
        self.frames.len() * FRAME_BYTES
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(fill: u8) -> Frame {
        Frame::from_bytes(vec![fill; FRAME_BYTES]).unwrap()
    }

    #[test]
    fn frame_rejects_wrong_sizes() {
        assert!(Frame::from_bytes(vec![0u8; FRAME_BYTES - 1]).is_err());
        assert!(Frame::from_bytes(vec![0u8; FRAME_BYTES + 1]).is_err());
        assert!(Frame::from_bytes(Vec::new()).is_err());
        assert!(Frame::from_bytes(vec![0u8; FRAME_BYTES]).is_ok());
    }

    #[test]
    fn frame_decodes_little_endian_floats() {
        let mut data = vec![0u8; FRAME_BYTES];
        data[0..4].copy_from_slice(&21.5f32.to_le_bytes());
        data[4..8].copy_from_slice(&(-3.25f32).to_le_bytes());
        let frame = Frame::from_bytes(data).unwrap();

        let temps: Vec<f32> = frame.temperatures().collect();
        assert_eq!(temps.len(), FRAME_PIXELS);
        assert_eq!(temps[0], 21.5);
        assert_eq!(temps[1], -3.25);
        assert_eq!(temps[2], 0.0);
    }

    #[test]
    fn buffer_enforces_limit() {
        let mut buf = FrameBuffer::with_limit(2);
        assert!(!buf.is_full());
        buf.push(test_frame(1)).unwrap();
        buf.push(test_frame(2)).unwrap();
        assert!(buf.is_full());
        assert!(buf.push(test_frame(3)).is_err());
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.memory_bytes(), 2 * FRAME_BYTES);
    }

    #[test]
    fn buffer_preserves_append_order() {
        let mut buf = FrameBuffer::with_limit(3);
        for fill in [9u8, 4, 7] {
            buf.push(test_frame(fill)).unwrap();
        }
        let fills: Vec<u8> = buf.iter().map(|f| f.as_bytes()[0]).collect();
        assert_eq!(fills, vec![9, 4, 7]);
    }
}
