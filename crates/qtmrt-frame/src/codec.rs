use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};
use crate::packet_type::PacketType;

/// Frame header: length (4) + type (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Default maximum total frame size: 64 MiB.
///
/// Image components can make single data frames large, so this is looser
/// than a typical control-protocol limit.
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024 * 1024;

/// One complete frame as it came off the wire.
///
/// The type tag is kept raw so that frames with tags from a newer server
/// can still be carried (and skipped) by the layers above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet type tag from the header.
    pub type_tag: u32,
    /// The frame body (everything after the 8-byte header).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Self {
            type_tag: packet_type.as_u32(),
            payload: payload.into(),
        }
    }

    /// A text frame (command or XML): the text followed by one NUL byte.
    pub fn text(packet_type: PacketType, text: &str) -> Self {
        let mut body = Vec::with_capacity(text.len() + 1);
        body.extend_from_slice(text.as_bytes());
        body.push(0);
        Self::new(packet_type, body)
    }

    /// Body of a text frame without its trailing NUL.
    pub fn text_body(&self) -> Bytes {
        match self.payload.last() {
            Some(0) => self.payload.slice(..self.payload.len() - 1),
            _ => self.payload.clone(),
        }
    }

    /// The decoded packet type, if the tag is known.
    pub fn packet_type(&self) -> Result<PacketType> {
        PacketType::try_from(self.type_tag)
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────────────┐
/// │ Length (4B)  │ Type (4B)    │ Payload              │
/// │ LE, total    │ LE           │ (Length - 8 bytes)   │
/// └──────────────┴──────────────┴──────────────────────┘
/// ```
pub fn encode_frame(type_tag: u32, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let total = HEADER_SIZE + payload.len();
    if total > u32::MAX as usize {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: u32::MAX as usize,
        });
    }
    dst.reserve(total);
    dst.put_u32_le(total as u32);
    dst.put_u32_le(type_tag);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_frame: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    let type_tag = u32::from_le_bytes([src[4], src[5], src[6], src[7]]);

    let total = length as usize;
    if total < HEADER_SIZE {
        return Err(FrameError::InvalidLength(length));
    }
    if total > max_frame {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: max_frame,
        });
    }

    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(total - HEADER_SIZE).freeze();

    Ok(Some(Frame { type_tag, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum total frame size in bytes (header included). Default: 64 MiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}

/// `tokio_util` codec for QTM frames.
#[derive(Debug, Clone, Default)]
pub struct RtCodec {
    config: FrameConfig,
}

impl RtCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }
}

impl Decoder for RtCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.config.max_frame_size)
    }
}

impl Encoder<Frame> for RtCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.wire_size() > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: frame.wire_size(),
                max: self.config.max_frame_size,
            });
        }
        encode_frame(frame.type_tag, &frame.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let payload = b"qtmversion";

        encode_frame(PacketType::Command.as_u32(), payload, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + payload.len());

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME).unwrap().unwrap();
        assert_eq!(frame.packet_type().unwrap(), PacketType::Command);
        assert_eq!(frame.payload.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn length_includes_header() {
        let mut buf = BytesMut::new();
        encode_frame(PacketType::Data.as_u32(), &[1, 2, 3], &mut buf).unwrap();
        assert_eq!(&buf[0..4], &11u32.to_le_bytes());
        assert_eq!(&buf[4..8], &3u32.to_le_bytes());
    }

    #[test]
    fn command_text_is_nul_terminated() {
        let mut buf = BytesMut::new();
        RtCodec::default()
            .encode(Frame::text(PacketType::Command, "version 1.23"), &mut buf)
            .unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&(8u32 + 12 + 1).to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(b"version 1.23\0");
        assert_eq!(buf.as_ref(), expected.as_slice());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x0C, 0x00, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_FRAME).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(1, b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_FRAME).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn decode_length_below_header() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(4);
        buf.put_u32_le(1);
        assert!(matches!(
            decode_frame(&mut buf, DEFAULT_MAX_FRAME),
            Err(FrameError::InvalidLength(4))
        ));
    }

    #[test]
    fn decode_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1024);
        buf.put_u32_le(3);
        assert!(matches!(
            decode_frame(&mut buf, 512),
            Err(FrameError::FrameTooLarge {
                size: 1024,
                max: 512
            })
        ));
    }

    #[test]
    fn empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(PacketType::NoMoreData.as_u32(), b"", &mut buf).unwrap();

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME).unwrap().unwrap();
        assert_eq!(frame.packet_type().unwrap(), PacketType::NoMoreData);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn unknown_type_is_carried_raw() {
        let mut buf = BytesMut::new();
        encode_frame(42, b"future", &mut buf).unwrap();

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME).unwrap().unwrap();
        assert_eq!(frame.type_tag, 42);
        assert!(matches!(
            frame.packet_type(),
            Err(FrameError::UnknownPacketType(42))
        ));
    }

    #[test]
    fn codec_encodes_and_decodes() {
        let mut codec = RtCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::new(PacketType::Xml, &b"<QTM_Settings/>\0"[..]), &mut buf)
            .unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.packet_type().unwrap(), PacketType::Xml);
        assert_eq!(frame.payload.as_ref(), b"<QTM_Settings/>\0");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn codec_rejects_oversized_frames() {
        let mut codec = RtCodec::new(FrameConfig { max_frame_size: 16 });
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Frame::new(PacketType::Command, vec![0u8; 32]), &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn text_body_strips_one_trailing_nul() {
        let frame = Frame::new(PacketType::Command, &b"Version set to 1.23\0"[..]);
        assert_eq!(frame.text_body().as_ref(), b"Version set to 1.23");

        let bare = Frame::new(PacketType::Xml, &b"<x/>"[..]);
        assert_eq!(bare.text_body().as_ref(), b"<x/>");

        let empty = Frame::new(PacketType::Error, Bytes::new());
        assert!(empty.text_body().is_empty());
    }

    #[test]
    fn frame_wire_size() {
        let frame = Frame::new(PacketType::Command, Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
    }
}
