use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use ipcseal_frame::{FrameConfig, FrameReader, FrameWriter};
use ipcseal_transport::PipeStream;
use tracing::trace;

use crate::error::{ChannelError, Result};

/// Which end of a pipe pair an endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeSide {
    Left,
    Right,
}

/// One end of a pipe channel, returned by
/// [`create_pipe`](crate::ChannelRegistry::create_pipe).
///
/// Owned by the caller. Only usable with the channel it was created for.
/// Both ends are symmetric: either may send or receive.
pub struct PipeEndpoint {
    channel: String,
    pair_id: u64,
    side: PipeSide,
    reader: FrameReader<PipeStream>,
    writer: FrameWriter<PipeStream>,
}

impl PipeEndpoint {
    pub(crate) fn new(
        channel: &str,
        pair_id: u64,
        side: PipeSide,
        stream: PipeStream,
        config: &FrameConfig,
    ) -> Result<Self> {
        let read_half = stream.try_clone()?;
        Ok(Self {
            channel: channel.to_string(),
            pair_id,
            side,
            reader: FrameReader::for_pipe(read_half, config)?,
            writer: FrameWriter::for_pipe(stream, config)?,
        })
    }

    /// Name of the channel this endpoint belongs to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn side(&self) -> PipeSide {
        self.side
    }

    pub(crate) fn pair_id(&self) -> u64 {
        self.pair_id
    }

    pub(crate) fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(payload)?;
        trace!(channel = %self.channel, side = ?self.side, len = payload.len(), "pipe frame sent");
        Ok(())
    }

    /// Receive one frame. `None` waits indefinitely.
    pub(crate) fn recv_frame(&mut self, timeout: Option<Duration>) -> Result<Bytes> {
        if let Some(timeout) = timeout {
            if !self.reader.wait_readable(timeout)? {
                return Err(ChannelError::Timeout(timeout));
            }
        }
        let payload = self.reader.read_frame()?;
        trace!(channel = %self.channel, side = ?self.side, len = payload.len(), "pipe frame received");
        Ok(payload)
    }
}

impl fmt::Debug for PipeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeEndpoint")
            .field("channel", &self.channel)
            .field("pair_id", &self.pair_id)
            .field("side", &self.side)
            .finish()
    }
}
