//! Client for the QTM real-time motion capture protocol.
//!
//! # Crate Structure
//!
//! - [`frame`]: packet framing and re-framing of socket reads
//! - [`data`]: lazy data frame parsing and per-component decoding
//! - [`protocol`]: async client engine (requests, events, streaming)
//! - [`discovery`]: UDP server discovery and reboot broadcast

/// Re-export frame types.
pub mod frame {
    pub use qtmrt_frame::*;
}

/// Re-export data frame types.
pub mod data {
    pub use qtmrt_data::*;
}

/// Re-export protocol engine types.
pub mod protocol {
    pub use qtmrt_protocol::*;
}

/// Re-export discovery types.
pub mod discovery {
    pub use qtmrt_discovery::*;
}

pub use qtmrt_data::{ComponentType, DataFrame};
pub use qtmrt_discovery::{discover, DiscoveryConfig, DiscoveryResponse};
pub use qtmrt_protocol::{connect, ConnectConfig, Event, Protocol, ProtocolError, Response};
