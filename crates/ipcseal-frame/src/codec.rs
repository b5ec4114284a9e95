use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "SE" (0x53 0x45).
pub const MAGIC: [u8; 2] = [0x53, 0x45];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Limits and socket timeouts applied to a framed pipe end.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest payload accepted on either side of the pipe.
    pub max_payload_size: usize,
    /// Socket read timeout; `None` blocks.
    pub read_timeout: Option<Duration>,
    /// Socket write timeout; `None` blocks.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Append `payload` to `dst` in wire form.
///
/// ```text
/// +------------+-------------+-------------------+
/// | "SE" (2B)  | len (4B LE) | payload (len B)   |
/// +------------+-------------+-------------------+
/// ```
pub fn encode_frame(payload: &[u8], max_payload: usize, dst: &mut BytesMut) -> Result<()> {
    let max = max_payload.min(u32::MAX as usize);
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Total length of the frame at the front of `src`, if all of it is buffered.
///
/// The header is validated as soon as it is complete, so a bad magic or an
/// oversized length fails before the payload arrives.
pub fn buffered_frame_len(src: &[u8], max_payload: usize) -> Result<Option<usize>> {
    let Some(header) = src.get(..HEADER_SIZE) else {
        return Ok(None);
    };
    if header[..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let len = u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize;
    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + len;
    Ok((src.len() >= total).then_some(total))
}

/// Split one payload off the front of `src`. `Ok(None)` means more bytes are needed.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    let Some(total) = buffered_frame_len(src, max_payload)? else {
        return Ok(None);
    };
    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(total - HEADER_SIZE).freeze()))
}
