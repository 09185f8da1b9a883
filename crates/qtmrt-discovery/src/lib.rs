//! Locating QTM servers on the local network.
//!
//! Discovery broadcasts one probe and collects replies until the network
//! has been quiet for a short window. Each call uses a fresh socket.
//!
//! ```no_run
//! # async fn demo() -> qtmrt_discovery::Result<()> {
//! use qtmrt_discovery::{discover, DiscoveryConfig};
//!
//! for server in discover(&DiscoveryConfig::default()).await? {
//!     println!("{}:{} {}", server.host, server.port, String::from_utf8_lossy(&server.info));
//! }
//! # Ok(())
//! # }
//! ```

pub mod discover;
pub mod error;
pub mod reboot;

pub use discover::{
    discover, encode_probe, parse_reply, Discovery, DiscoveryConfig, DiscoveryResponse,
    DEFAULT_SILENCE, DISCOVERY_PORT, PROBE_SIZE,
};
pub use error::{DiscoveryError, Result};
pub use reboot::{reboot, reboot_to, REBOOT_PAYLOAD, REBOOT_PORT};
