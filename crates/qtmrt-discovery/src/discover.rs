use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use qtmrt_frame::{PacketType, HEADER_SIZE};
use tokio::net::UdpSocket;

use crate::error::{DiscoveryError, Result};

/// UDP port servers listen on for discovery probes.
pub const DISCOVERY_PORT: u16 = 22226;
/// How long discovery waits for another reply before ending.
pub const DEFAULT_SILENCE: Duration = Duration::from_millis(200);
/// Probe size: frame header plus the big-endian reply port.
pub const PROBE_SIZE: usize = HEADER_SIZE + 2;

/// Bytes after the info text: its NUL and the big-endian base port.
const REPLY_TRAILER: usize = 3;
const MAX_DATAGRAM: usize = 2048;

/// Configuration for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local address to bind; selects the network interface.
    pub interface: IpAddr,
    /// Where the probe is sent. Defaults to the limited broadcast address.
    pub target: SocketAddr,
    /// Discovery ends after this long without a reply.
    pub silence: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            target: SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DISCOVERY_PORT),
            silence: DEFAULT_SILENCE,
        }
    }
}

impl DiscoveryConfig {
    /// Discover through the interface with address `interface`.
    pub fn on_interface(interface: IpAddr) -> Self {
        Self {
            interface,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    pub fn with_silence(mut self, silence: Duration) -> Self {
        self.silence = silence;
        self
    }
}

/// One server that answered the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// Free-form server description (host name, version, camera count),
    /// exactly as sent.
    pub info: Bytes,
    /// Address the reply came from.
    pub host: IpAddr,
    /// Base port of the server's RT interface.
    pub port: u16,
}

/// Encode the probe asking servers to reply to `reply_port`.
pub fn encode_probe(reply_port: u16) -> Bytes {
    let mut probe = BytesMut::with_capacity(PROBE_SIZE);
    probe.put_u32_le(PROBE_SIZE as u32);
    probe.put_u32_le(PacketType::Discover.as_u32());
    probe.put_u16(reply_port);
    probe.freeze()
}

/// Parse a reply datagram received from `host`.
///
/// Layout: frame header, `declared - 11` info bytes, one NUL, then the base
/// port as a big-endian `u16` in the last two declared bytes.
pub fn parse_reply(datagram: &[u8], host: IpAddr) -> Result<DiscoveryResponse> {
    let malformed = |declared| DiscoveryError::MalformedReply {
        len: datagram.len(),
        declared,
    };

    let mut header = datagram;
    if header.remaining() < 4 {
        return Err(malformed(0));
    }
    let declared = header.get_u32_le();
    let size = declared as usize;
    if size < HEADER_SIZE + REPLY_TRAILER || size > datagram.len() {
        return Err(malformed(declared));
    }

    let info = Bytes::copy_from_slice(&datagram[HEADER_SIZE..size - REPLY_TRAILER]);
    let mut trailer = &datagram[size - 2..size];
    let port = trailer.get_u16();
    Ok(DiscoveryResponse { info, host, port })
}

/// A running discovery: one socket, one probe, replies until silence.
#[derive(Debug)]
pub struct Discovery {
    socket: UdpSocket,
    silence: Duration,
    buf: Vec<u8>,
    finished: bool,
}

impl Discovery {
    /// Bind a fresh broadcast-enabled socket and send the probe.
    pub async fn start(config: &DiscoveryConfig) -> Result<Discovery> {
        let bind = SocketAddr::new(config.interface, 0);
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|source| DiscoveryError::Bind { addr: bind, source })?;
        socket.set_broadcast(true)?;

        let local_port = socket.local_addr()?.port();
        tracing::debug!(interface = %config.interface, local_port, target = %config.target, "sending discovery probe");
        socket
            .send_to(&encode_probe(local_port), config.target)
            .await
            .map_err(|source| DiscoveryError::Send {
                addr: config.target,
                source,
            })?;

        Ok(Discovery {
            socket,
            silence: config.silence,
            buf: vec![0u8; MAX_DATAGRAM],
            finished: false,
        })
    }

    /// Local address the probe was sent from.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Next reply, or `None` once the silence window passes without one.
    ///
    /// Malformed replies are logged and skipped.
    pub async fn next(&mut self) -> Result<Option<DiscoveryResponse>> {
        while !self.finished {
            let received =
                tokio::time::timeout(self.silence, self.socket.recv_from(&mut self.buf)).await;
            let (len, from) = match received {
                Ok(result) => result?,
                Err(_) => {
                    tracing::debug!("discovery finished");
                    self.finished = true;
                    break;
                }
            };

            match parse_reply(&self.buf[..len], from.ip()) {
                Ok(response) => {
                    tracing::debug!(
                        host = %response.host,
                        port = response.port,
                        info = %String::from_utf8_lossy(&response.info),
                        "discovered"
                    );
                    return Ok(Some(response));
                }
                Err(err) => tracing::warn!(%from, error = %err, "ignoring discovery reply"),
            }
        }
        Ok(None)
    }
}

/// Run a discovery and collect every reply.
pub async fn discover(config: &DiscoveryConfig) -> Result<Vec<DiscoveryResponse>> {
    let mut discovery = Discovery::start(config).await?;
    let mut responses = Vec::new();
    while let Some(response) = discovery.next().await? {
        responses.push(response);
    }
    Ok(responses)
}
