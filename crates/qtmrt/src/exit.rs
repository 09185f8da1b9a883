use std::fmt;
use std::io;

use qtmrt_data::DecodeError;
use qtmrt_discovery::DiscoveryError;
use qtmrt_frame::FrameError;
use qtmrt_protocol::ProtocolError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidLength(_)
        | FrameError::FrameTooLarge { .. }
        | FrameError::UnknownPacketType(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn decode_error(context: &str, err: DecodeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    match err {
        ProtocolError::Io(source) => io_error(context, source),
        ProtocolError::Frame(err) => frame_error(context, err),
        ProtocolError::Decode(err) => decode_error(context, err),
        ProtocolError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ProtocolError::InvalidVersion(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ProtocolError::NotConnected | ProtocolError::Disconnected => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ProtocolError::Server(_) | ProtocolError::VersionRejected { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        ProtocolError::EventWaitBusy => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn discovery_error(context: &str, err: DiscoveryError) -> CliError {
    match err {
        DiscoveryError::Bind { source, .. }
        | DiscoveryError::Send { source, .. }
        | DiscoveryError::Io(source) => io_error(context, source),
        DiscoveryError::MalformedReply { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
