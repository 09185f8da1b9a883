//! Async client engine for the QTM real-time protocol.
//!
//! [`connect`] opens a TCP connection, negotiates the protocol version and
//! returns a [`Protocol`] handle. Requests are answered strictly in FIFO
//! order; events and streamed frames are delivered alongside.
//!
//! ```no_run
//! # async fn demo() -> qtmrt_protocol::Result<()> {
//! use qtmrt_protocol::{connect, ConnectConfig};
//!
//! let protocol = connect("127.0.0.1", ConnectConfig::default()).await?;
//! let version = protocol.send_command("qtmversion", true).await?.await?;
//! println!("{}", version.text().unwrap_or_default());
//! protocol.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod engine;
pub mod error;
pub mod event;

pub use connection::{
    connect, connect_stream, ConnectConfig, DEFAULT_PORT, DEFAULT_TIMEOUT, DEFAULT_VERSION,
};
pub use engine::{
    DisconnectCallback, EventCallback, PacketCallback, PendingResponse, Protocol, Response,
};
pub use error::{ProtocolError, Result};
pub use event::Event;
