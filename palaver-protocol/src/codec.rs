//! Frame codec for the wire protocol
//!
//! Frames are single JSON documents terminated by a newline. The codec pair
//! mirrors the two directions: [`ClientCodec`] is used by the client side,
//! [`ServerCodec`] by a server (and by tests standing in for one).

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::packets::{ClientPacket, ServerPacket};

/// Maximum frame size (1 MB)
const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Codec for ClientPacket (encoding) and ServerPacket (decoding)
/// Used by the client side
pub struct ClientCodec;

impl ClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ClientCodec {
    type Item = ServerPacket;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<ClientPacket> for ClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ClientPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Codec for ServerPacket (encoding) and ClientPacket (decoding)
/// Used by the server side
pub struct ServerCodec;

impl ServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = ClientPacket;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<ServerPacket> for ServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ServerPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Decode one newline-terminated JSON frame
fn decode_frame<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
) -> Result<Option<T>, CodecError> {
    let Some(pos) = src.iter().position(|b| *b == b'\n') else {
        // No terminator yet; refuse to buffer without bound
        if src.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: src.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        return Ok(None);
    };

    if pos > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: pos,
            max: MAX_FRAME_SIZE,
        });
    }

    // Consume the line including its terminator
    let line = src.split_to(pos + 1);
    let mut frame: &[u8] = &line[..pos];
    if frame.last() == Some(&b'\r') {
        frame = &frame[..frame.len() - 1];
    }

    let msg: T = serde_json::from_slice(frame)?;
    Ok(Some(msg))
}

/// Encode one JSON frame with its newline terminator
fn encode_frame<T: serde::Serialize>(item: &T, dst: &mut BytesMut) -> Result<(), CodecError> {
    let data = serde_json::to_vec(item)?;

    if data.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    dst.reserve(data.len() + 1);
    dst.put_slice(&data);
    dst.put_u8(b'\n');
    Ok(())
}
