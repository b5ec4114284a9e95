use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use ipcseal_transport::PipeStream;
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{transport_to_frame_error, FrameError, Result};

/// Writes each payload as one frame.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    max_payload: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T, config: &FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            max_payload: config.max_payload_size,
        }
    }

    /// Encode `payload` and write the whole frame before returning.
    ///
    /// An oversized payload is rejected before anything reaches the stream.
    /// A socket write timeout surfaces as [`FrameError::Io`].
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, self.max_payload, &mut self.buf)?;

        let mut offset = 0;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        loop {
            match self.inner.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        trace!(len = payload.len(), "frame written");
        Ok(())
    }
}

impl FrameWriter<PipeStream> {
    /// Writer for a pipe end, with the configured socket write timeout applied.
    pub fn for_pipe(inner: PipeStream, config: &FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::new(inner, config))
    }
}
