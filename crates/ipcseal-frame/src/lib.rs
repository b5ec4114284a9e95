//! Length-prefixed message framing for duplex pipes.
//!
//! A pipe is a byte stream; envelopes need boundaries. Every message is
//! framed with:
//! - A 2-byte magic number ("SE") for stream synchronization
//! - A 4-byte little-endian payload length
//!
//! Readers hand back whole payloads; partial reads stay inside the crate.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    buffered_frame_len, decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
    MAGIC,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
