//! MLX90640 reader process source.
//!
//! `ReaderSource` launches the reader executable with the target frame rate
//! as its only argument and consumes 3072-byte frames from its stdout pipe.
//! The sensor needs privileged I2C access on deployment hardware, so the
//! reader is spawned through sudo unless elevation is disabled.
//!
//! A `stub://` path selects a synthetic backend that produces deterministic
//! gradient frames with no child process.

use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

use super::FrameSource;
use crate::config::is_stub_path;
use crate::frame::{Frame, FRAME_BYTES, FRAME_PIXELS};

/// Configuration for a reader source.
#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// Reader executable path, or `stub://...` for the synthetic backend.
    pub path: PathBuf,
    /// Frame rate passed to the reader as its argument.
    pub fps: u32,
    /// Spawn through sudo.
    pub elevate: bool,
}

/// Frame source backed by the reader process (or the synthetic stub).
pub struct ReaderSource {
    backend: ReaderBackend,
}

enum ReaderBackend {
    Child(ChildReader),
    Synthetic(SyntheticReader),
}

impl ReaderSource {
    pub fn new(config: ReaderConfig) -> Self {
        let backend = if is_stub_path(&config.path) {
            ReaderBackend::Synthetic(SyntheticReader::new(config))
        } else {
            ReaderBackend::Child(ChildReader::new(config))
        };
        Self { backend }
    }

    /// Start producing frames. For the child backend this spawns the reader
    /// process; failure here is a failed-start error, distinct from the
    /// missing-executable configuration error caught at config validation.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            ReaderBackend::Child(source) => source.connect(),
            ReaderBackend::Synthetic(source) => source.connect(),
        }
    }

    pub fn stats(&self) -> ReaderStats {
        match &self.backend {
            ReaderBackend::Child(source) => source.stats(),
            ReaderBackend::Synthetic(source) => source.stats(),
        }
    }

    /// Tear the source down: kill and reap the reader process and drain
    /// whatever it wrote to stderr into the log. Idempotent.
    pub fn shutdown(&mut self) {
        if let ReaderBackend::Child(source) = &mut self.backend {
            source.shutdown();
        }
    }
}

impl FrameSource for ReaderSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            ReaderBackend::Child(source) => source.next_frame(),
            ReaderBackend::Synthetic(source) => source.next_frame(),
        }
    }
}

/// Statistics for a reader source.
#[derive(Clone, Debug)]
pub struct ReaderStats {
    pub frames_read: u64,
    pub bytes_read: u64,
    pub source: String,
}

// ----------------------------------------------------------------------------
// Child process backend
// ----------------------------------------------------------------------------

struct ChildReader {
    config: ReaderConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    frames_read: u64,
}

impl ChildReader {
    fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            child: None,
            stdout: None,
            frames_read: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        let mut cmd = if self.config.elevate {
            let mut cmd = Command::new("sudo");
            cmd.arg(&self.config.path);
            cmd
        } else {
            Command::new(&self.config.path)
        };
        cmd.arg(self.config.fps.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "failed to start capture reader {}",
                self.config.path.display()
            )
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("capture reader has no stdout pipe"))?;

        log::info!(
            "capture reader started: {} at {} fps (pid {})",
            self.config.path.display(),
            self.config.fps,
            child.id()
        );
        self.child = Some(child);
        self.stdout = Some(stdout);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| anyhow!("capture reader not connected"))?;
        let frame = read_one_frame(stdout)?;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    fn stats(&self) -> ReaderStats {
        ReaderStats {
            frames_read: self.frames_read,
            bytes_read: self.frames_read * FRAME_BYTES as u64,
            source: self.config.path.display().to_string(),
        }
    }

    fn shutdown(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        self.stdout = None;

        if let Err(e) = child.kill() {
            log::debug!("capture reader kill: {}", e);
        }
        match child.wait() {
            Ok(status) => log::debug!("capture reader exited: {}", status),
            Err(e) => log::warn!("failed to reap capture reader: {}", e),
        }

        // The stderr pipe buffer may hold diagnostics from the reader.
        if let Some(mut stderr) = child.stderr.take() {
            let mut output = String::new();
            if stderr.read_to_string(&mut output).is_ok() {
                for line in output.lines().filter(|l| !l.trim().is_empty()) {
                    log::debug!("reader stderr: {}", line);
                }
            }
        }
    }
}

impl Drop for ChildReader {
    // Backstop so an error path cannot leak the reader process.
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Read exactly one frame from a byte stream.
///
/// A pipe read may return fewer bytes than one frame, so this loops until the
/// frame is complete, retrying interrupted reads. Clean end of stream on a
/// frame boundary returns `Ok(None)`; end of stream mid-frame is a
/// truncated-frame error. This is the only place that policy lives.
pub(crate) fn read_one_frame<R: Read>(reader: &mut R) -> Result<Option<Frame>> {
    let mut buf = vec![0u8; FRAME_BYTES];
    let mut filled = 0;
    while filled < FRAME_BYTES {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(anyhow!(
                    "truncated frame: stream ended after {} of {} bytes",
                    filled,
                    FRAME_BYTES
                ));
            }
            Ok(n) => {
                log::debug!("got {} bytes of frame data", n);
                filled += n;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read from capture reader"),
        }
    }
    Ok(Some(Frame::from_bytes(buf)?))
}

// ----------------------------------------------------------------------------
// Synthetic backend (stub://) for tests and hardware-free runs
// ----------------------------------------------------------------------------

struct SyntheticReader {
    config: ReaderConfig,
    frame_count: u64,
}

impl SyntheticReader {
    fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "reader source connected to {} (synthetic)",
            self.config.path.display()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;
        let mut data = Vec::with_capacity(FRAME_BYTES);
        for i in 0..FRAME_PIXELS {
            // Row gradient around room temperature, drifting per frame.
            let ambient = 20.0 + (i % 32) as f32 * 0.25;
            let drift = (self.frame_count % 16) as f32 * 0.1;
            data.extend_from_slice(&(ambient + drift).to_le_bytes());
        }
        Ok(Some(Frame::from_bytes(data)?))
    }

    fn stats(&self) -> ReaderStats {
        ReaderStats {
            frames_read: self.frame_count,
            bytes_read: self.frame_count * FRAME_BYTES as u64,
            source: self.config.path.display().to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stub_config() -> ReaderConfig {
        ReaderConfig {
            path: PathBuf::from("stub://gradient"),
            fps: 4,
            elevate: false,
        }
    }

    /// Yields its input in fixed-size chunks to simulate pipe short reads.
    struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn read_one_frame_reassembles_short_reads() -> Result<()> {
        let payload: Vec<u8> = (0..FRAME_BYTES).map(|i| (i % 251) as u8).collect();
        let mut reader = ChunkedReader {
            data: payload.clone(),
            pos: 0,
            chunk: 100,
        };

        let frame = read_one_frame(&mut reader)?.expect("one full frame");
        assert_eq!(frame.as_bytes(), &payload[..]);

        // Stream is exhausted on the frame boundary.
        assert!(read_one_frame(&mut reader)?.is_none());
        Ok(())
    }

    #[test]
    fn read_one_frame_clean_eof_is_end_of_stream() -> Result<()> {
        let mut reader = Cursor::new(Vec::<u8>::new());
        assert!(read_one_frame(&mut reader)?.is_none());
        Ok(())
    }

    #[test]
    fn read_one_frame_rejects_mid_frame_eof() {
        let mut reader = Cursor::new(vec![0u8; FRAME_BYTES / 2]);
        let err = read_one_frame(&mut reader).unwrap_err();
        assert!(err.to_string().contains("truncated frame"));
    }

    #[test]
    fn synthetic_reader_produces_frames() -> Result<()> {
        let mut source = ReaderSource::new(stub_config());
        source.connect()?;

        let a = source.next_frame()?.expect("frame");
        let b = source.next_frame()?.expect("frame");
        assert_eq!(a.as_bytes().len(), FRAME_BYTES);
        assert_ne!(a.as_bytes(), b.as_bytes(), "frames drift between readouts");

        let stats = source.stats();
        assert_eq!(stats.frames_read, 2);
        assert_eq!(stats.bytes_read, 2 * FRAME_BYTES as u64);
        Ok(())
    }

    #[test]
    fn shutdown_without_connect_is_a_no_op() {
        let mut source = ReaderSource::new(ReaderConfig {
            path: PathBuf::from("/nonexistent/rawrgb"),
            fps: 4,
            elevate: false,
        });
        source.shutdown();
        source.shutdown();
    }
}
