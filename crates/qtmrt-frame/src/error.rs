/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header declares a total length smaller than the header itself.
    #[error("invalid frame length {0} (header alone is 8 bytes)")]
    InvalidLength(u32),

    /// The declared frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The header carries a packet type tag outside the known tag space.
    #[error("unknown packet type {0}")]
    UnknownPacketType(u32),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
