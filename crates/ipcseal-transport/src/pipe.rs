use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, TransportError};

/// One end of a connected duplex pipe. Implements `Read` and `Write`.
///
/// Both ends are symmetric: either may send and either may receive. The
/// stream has no native receive timeout semantics beyond the socket option;
/// callers that need a bounded wait use [`PipeStream::poll_readable`] first.
pub struct PipeStream {
    inner: UnixStream,
}

/// Create two connected, symmetric pipe ends.
pub fn pipe_pair() -> Result<(PipeStream, PipeStream)> {
    let (left, right) = UnixStream::pair().map_err(TransportError::Pair)?;
    debug!(
        left = left.as_raw_fd(),
        right = right.as_raw_fd(),
        "created pipe pair"
    );
    Ok((PipeStream::from_unix(left), PipeStream::from_unix(right)))
}

impl Read for PipeStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for PipeStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl AsRawFd for PipeStream {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl PipeStream {
    /// Wrap an already connected Unix stream socket.
    pub fn from_unix(stream: UnixStream) -> Self {
        Self { inner: stream }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_unix(cloned))
    }

    /// Wait up to `timeout` for the stream to become readable.
    ///
    /// Returns `true` when a read would not block: data is pending, or the
    /// peer hung up (the read then reports end of stream). Returns `false`
    /// when the wait elapsed with nothing to read. A timeout too large to
    /// form a deadline waits indefinitely.
    pub fn poll_readable(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let millis = match deadline {
                Some(deadline) => deadline
                    .saturating_duration_since(Instant::now())
                    .as_nanos()
                    .div_ceil(1_000_000)
                    .min(libc::c_int::MAX as u128) as libc::c_int,
                None => -1,
            };

            let mut pfd = libc::pollfd {
                fd: self.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };

            // SAFETY: `pfd` is a valid, writable pollfd and we pass a count of 1.
            let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Io(err));
            }

            if rc == 0 {
                // poll caps its wait at c_int::MAX millis; keep going until the deadline.
                if deadline.is_some_and(|deadline| Instant::now() < deadline) {
                    continue;
                }
                return Ok(false);
            }
            return Ok(pfd.revents != 0);
        }
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeStream")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}
