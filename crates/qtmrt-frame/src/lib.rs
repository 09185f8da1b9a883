//! Length-prefixed packet framing for the QTM real-time protocol.
//!
//! Every packet on the wire is framed with:
//! - A 4-byte little-endian total length (header included)
//! - A 4-byte little-endian packet type tag
//!
//! [`FrameReader`] turns arbitrary socket deliveries into complete frames.
//! Nothing here knows what a frame *means*; dispatch lives in `qtmrt-protocol`.

pub mod codec;
pub mod error;
pub mod packet_type;
pub mod reader;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, RtCodec, DEFAULT_MAX_FRAME, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use packet_type::PacketType;
pub use reader::FrameReader;
