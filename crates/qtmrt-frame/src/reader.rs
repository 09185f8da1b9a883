use bytes::BytesMut;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Re-frames arbitrary socket deliveries into complete frames.
///
/// Bytes left over after the last complete frame are retained verbatim and
/// prefixed to the next delivery. No frame is ever emitted partially and no
/// byte is dropped or duplicated across calls.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameReader {
    /// Create a new frame reader with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append one delivery and return every frame it completes, in arrival order.
    ///
    /// An error means the header at the buffer front is unusable; the stream
    /// cannot be re-synchronised after that.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buf.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut self.buf, self.config.max_frame_size)? {
            frames.push(frame);
        }

        if !self.buf.is_empty() {
            tracing::trace!(buffered = self.buf.len(), "retaining partial frame");
        }
        Ok(frames)
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;
    use crate::error::FrameError;
    use crate::packet_type::PacketType;

    fn wire(frames: &[(PacketType, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (kind, payload) in frames {
            encode_frame(kind.as_u32(), payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn summary(frames: &[Frame]) -> Vec<(u32, Vec<u8>)> {
        frames
            .iter()
            .map(|f| (f.type_tag, f.payload.to_vec()))
            .collect()
    }

    #[test]
    fn single_delivery_multiple_frames() {
        let bytes = wire(&[
            (PacketType::Command, b"one\0"),
            (PacketType::Event, &[3]),
            (PacketType::Xml, b"<x/>\0"),
        ]);

        let mut reader = FrameReader::new();
        let frames = reader.feed(&bytes).unwrap();

        assert_eq!(
            summary(&frames),
            vec![
                (1, b"one\0".to_vec()),
                (6, vec![3]),
                (2, b"<x/>\0".to_vec()),
            ]
        );
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn partial_header_is_retained() {
        let bytes = wire(&[(PacketType::Command, b"hello\0")]);
        let mut reader = FrameReader::new();

        assert!(reader.feed(&bytes[..5]).unwrap().is_empty());
        assert_eq!(reader.buffered(), 5);

        let frames = reader.feed(&bytes[5..]).unwrap();
        assert_eq!(summary(&frames), vec![(1, b"hello\0".to_vec())]);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn partial_payload_is_retained_verbatim() {
        let bytes = wire(&[
            (PacketType::Command, b"first\0"),
            (PacketType::Data, &[9; 40]),
        ]);
        let split = 8 + 6 + 8 + 10;

        let mut reader = FrameReader::new();
        let frames = reader.feed(&bytes[..split]).unwrap();
        assert_eq!(summary(&frames), vec![(1, b"first\0".to_vec())]);
        assert_eq!(reader.buffered(), 18);

        let frames = reader.feed(&bytes[split..]).unwrap();
        assert_eq!(summary(&frames), vec![(3, vec![9; 40])]);
    }

    #[test]
    fn chunking_never_changes_the_frame_sequence() {
        let bytes = wire(&[
            (PacketType::Command, b"QTM RT Interface connected\0"),
            (PacketType::Event, &[1]),
            (PacketType::Data, &[0xAB; 37]),
            (PacketType::NoMoreData, b""),
            (PacketType::Error, b"Parse error\0"),
        ]);

        let mut whole = FrameReader::new();
        let expected = summary(&whole.feed(&bytes).unwrap());
        assert_eq!(expected.len(), 5);

        // Every single split point.
        for split in 0..=bytes.len() {
            let mut reader = FrameReader::new();
            let mut got = summary(&reader.feed(&bytes[..split]).unwrap());
            got.extend(summary(&reader.feed(&bytes[split..]).unwrap()));
            assert_eq!(got, expected, "split at {split}");
            assert_eq!(reader.buffered(), 0);
        }

        // Uneven chunk sizes, including empty deliveries.
        for chunk in [1usize, 2, 3, 7, 13, 64] {
            let mut reader = FrameReader::new();
            let mut got = Vec::new();
            for piece in bytes.chunks(chunk) {
                got.extend(summary(&reader.feed(piece).unwrap()));
                got.extend(summary(&reader.feed(&[]).unwrap()));
            }
            assert_eq!(got, expected, "chunk size {chunk}");
        }
    }

    #[test]
    fn zero_length_body_frame() {
        let bytes = wire(&[(PacketType::NoMoreData, b"")]);
        let mut reader = FrameReader::new();
        let frames = reader.feed(&bytes).unwrap();
        assert_eq!(summary(&frames), vec![(4, Vec::new())]);
    }

    #[test]
    fn invalid_length_is_reported() {
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(3);
        bytes.put_u32_le(1);

        let mut reader = FrameReader::new();
        assert!(matches!(
            reader.feed(&bytes),
            Err(FrameError::InvalidLength(3))
        ));
    }

    #[test]
    fn oversized_frame_is_reported() {
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(4096);
        bytes.put_u32_le(3);

        let mut reader = FrameReader::with_config(FrameConfig {
            max_frame_size: 1024,
        });
        assert!(matches!(
            reader.feed(&bytes),
            Err(FrameError::FrameTooLarge { .. })
        ));
    }
}
