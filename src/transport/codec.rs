//! Line codec for the server socket.
//!
//! The server speaks newline-delimited JSON over its local socket. This
//! wraps [`tokio_util::codec::LinesCodec`] with a fixed maximum line
//! length so an unterminated or runaway message cannot exhaust memory.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::errors::{ClientError, Result};

/// Maximum line length accepted from the server: 1 MiB.
///
/// Inbound lines past this limit make [`LineCodec::decode`] return
/// [`ClientError::Protocol`] instead of allocating without bound.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Newline-delimited JSON codec for the server stream.
///
/// Each `\n`-terminated UTF-8 string is one complete message. The
/// max-length limit is a decoder-side concern; encoding appends the
/// terminator and never truncates.
#[derive(Debug)]
pub struct LineCodec(LinesCodec);

impl LineCodec {
    /// Creates a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

impl Encoder<String> for LineCodec {
    type Error = ClientError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

fn map_codec_error(e: LinesCodecError) -> ClientError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            ClientError::Protocol(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => ClientError::Io(io_err.to_string()),
    }
}
