use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use ipcseal_transport::PipeStream;
use tracing::trace;

use crate::codec::{buffered_frame_len, decode_frame, FrameConfig};
use crate::error::{transport_to_frame_error, FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads whole frames from a byte stream, buffering partial reads.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    max_payload: usize,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T, config: &FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_payload: config.max_payload_size,
        }
    }

    /// Block until the next frame is complete and return its payload.
    ///
    /// End of stream, even mid-frame, is `ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(payload) = decode_frame(&mut self.buf, self.max_payload)? {
                trace!(len = payload.len(), buffered = self.buf.len(), "frame decoded");
                return Ok(payload);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };
            if read == 0 {
                trace!(buffered = self.buf.len(), "stream closed");
                return Err(FrameError::ConnectionClosed);
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn has_buffered_frame(&self) -> Result<bool> {
        Ok(buffered_frame_len(&self.buf, self.max_payload)?.is_some())
    }
}

impl FrameReader<PipeStream> {
    /// Reader for a pipe end, with the configured socket read timeout applied.
    pub fn for_pipe(inner: PipeStream, config: &FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::new(inner, config))
    }

    /// Wait up to `timeout` for a frame to start arriving.
    ///
    /// A complete buffered frame counts as ready without touching the pipe.
    /// `true` only means the first byte is there: a frame the peer is still
    /// writing can make the following [`read_frame`](Self::read_frame) block.
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        if self.has_buffered_frame()? {
            return Ok(true);
        }
        self.inner
            .poll_readable(timeout)
            .map_err(transport_to_frame_error)
    }
}
