use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::error::{DiscoveryError, Result};

/// UDP port cameras listen on for the reboot broadcast.
pub const REBOOT_PORT: u16 = 9930;
/// The whole reboot datagram.
pub const REBOOT_PAYLOAD: &[u8] = b"reboot";

/// Broadcast a reboot request to every camera reachable from `interface`.
///
/// No reply is expected.
pub async fn reboot(interface: IpAddr) -> Result<()> {
    reboot_to(
        interface,
        SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), REBOOT_PORT),
    )
    .await
}

/// Send the reboot datagram from `interface` to an explicit `target`.
pub async fn reboot_to(interface: IpAddr, target: SocketAddr) -> Result<()> {
    let bind = SocketAddr::new(interface, 0);
    let socket = UdpSocket::bind(bind)
        .await
        .map_err(|source| DiscoveryError::Bind { addr: bind, source })?;
    socket.set_broadcast(true)?;

    tracing::info!(%interface, %target, "sending reboot");
    socket
        .send_to(REBOOT_PAYLOAD, target)
        .await
        .map_err(|source| DiscoveryError::Send {
            addr: target,
            source,
        })?;
    Ok(())
}
