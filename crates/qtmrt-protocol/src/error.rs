use std::time::Duration;

/// Errors that can occur in protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// No transport is attached to the engine.
    #[error("not connected")]
    NotConnected,

    /// The server answered a request with an Error packet.
    #[error("server error: {0}")]
    Server(String),

    /// A response or event did not arrive in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// `await_event` was called while another wait is outstanding.
    #[error("already waiting for an event")]
    EventWaitBusy,

    /// The engine went away before the request was answered.
    #[error("connection closed before a response arrived")]
    Disconnected,

    /// The server refused the requested protocol version.
    #[error("protocol version {version} rejected: {reason}")]
    VersionRejected { version: String, reason: String },

    /// A version string that is not `<major>.<minor>`.
    #[error("invalid version '{0}': expected '<major>.<minor>'")]
    InvalidVersion(String),

    /// Socket-level error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] qtmrt_frame::FrameError),

    /// A data frame that could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] qtmrt_data::DecodeError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
