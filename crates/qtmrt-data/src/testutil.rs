//! Builders for hand-made data frame payloads used by unit tests.

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::ComponentType;

/// Little-endian byte builder.
#[derive(Default)]
pub struct Body {
    buf: BytesMut,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16_le(v);
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.buf.put_i16_le(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32_le(v);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32_le(v);
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_f32_le(v);
        self
    }

    pub fn raw(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_slice(v);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }
}

/// One component with its `(size, type)` header prepended.
pub fn component_bytes(kind: ComponentType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&(8 + body.len() as u32).to_le_bytes());
    out.extend_from_slice(&kind.as_u32().to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// A full data frame payload holding the given pre-encoded components.
pub fn data_frame(timestamp: i64, frame_number: u32, components: &[Vec<u8>]) -> Bytes {
    let mut body = Body::new();
    body.raw(&timestamp.to_le_bytes())
        .u32(frame_number)
        .u32(components.len() as u32);
    for component in components {
        body.raw(component);
    }
    body.bytes()
}
