use std::net::SocketAddr;

/// Errors that can occur during discovery or reboot broadcasts.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Failed to bind the UDP socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to send a datagram.
    #[error("failed to send to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A reply whose header does not fit the datagram.
    #[error("malformed discovery reply ({len} bytes, declared {declared})")]
    MalformedReply { len: usize, declared: u32 },

    /// Other socket error.
    #[error("discovery I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
