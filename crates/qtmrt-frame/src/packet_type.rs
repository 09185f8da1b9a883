//! Packet type tags carried in every frame header.

use std::fmt;

use crate::error::FrameError;

/// Packet type tag space. The integer values are stable wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum PacketType {
    /// Server-side failure; body is a NUL-terminated message.
    Error = 0,
    /// Command text, or the textual answer to one.
    Command = 1,
    /// XML settings document.
    Xml = 2,
    /// One measurement frame.
    Data = 3,
    /// End of a measurement stream.
    NoMoreData = 4,
    C3dFile = 5,
    /// One-byte asynchronous state change.
    Event = 6,
    /// UDP discovery probe/reply.
    Discover = 7,
    QtmFile = 8,
    None = 9,
}

impl PacketType {
    /// The wire value of this tag.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Returns a human-readable name for the tag.
    pub fn name(self) -> &'static str {
        match self {
            PacketType::Error => "ERROR",
            PacketType::Command => "COMMAND",
            PacketType::Xml => "XML",
            PacketType::Data => "DATA",
            PacketType::NoMoreData => "NO_MORE_DATA",
            PacketType::C3dFile => "C3D_FILE",
            PacketType::Event => "EVENT",
            PacketType::Discover => "DISCOVER",
            PacketType::QtmFile => "QTM_FILE",
            PacketType::None => "NONE",
        }
    }

    /// Look up a tag by its wire value.
    pub fn from_u32(value: u32) -> Option<PacketType> {
        Some(match value {
            0 => PacketType::Error,
            1 => PacketType::Command,
            2 => PacketType::Xml,
            3 => PacketType::Data,
            4 => PacketType::NoMoreData,
            5 => PacketType::C3dFile,
            6 => PacketType::Event,
            7 => PacketType::Discover,
            8 => PacketType::QtmFile,
            9 => PacketType::None,
            _ => return None,
        })
    }

    /// Returns true if the body is NUL-terminated text.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            PacketType::Error | PacketType::Command | PacketType::Xml
        )
    }
}

impl TryFrom<u32> for PacketType {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self, FrameError> {
        PacketType::from_u32(value).ok_or(FrameError::UnknownPacketType(value))
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
