//! Wake-on-LAN delivery over UDP broadcast.

use core::future::Future;
use core::net::{Ipv4Addr, SocketAddrV4};

use eyre::WrapErr as _;
use tokio::net::UdpSocket;
use tracing::debug;

use powerlan_common::MagicPacket;

/// Puts a framed magic packet on the wire.
pub trait WakeSender: Send + Sync + 'static {
    fn send(&self, packet: &MagicPacket) -> impl Future<Output = eyre::Result<()>> + Send;
}

/// Broadcasts to a fixed address, normally `255.255.255.255:9`.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastWake {
    target: SocketAddrV4,
}

impl BroadcastWake {
    #[must_use]
    pub const fn new(target: SocketAddrV4) -> Self {
        Self { target }
    }
}

impl WakeSender for BroadcastWake {
    async fn send(&self, packet: &MagicPacket) -> eyre::Result<()> {
        send_magic_packet(packet, self.target).await
    }
}

/// Sends one magic packet from an ephemeral broadcast-enabled socket.
///
/// # Errors
///
/// Returns an error if the socket can't be opened or the datagram isn't sent.
pub async fn send_magic_packet(packet: &MagicPacket, target: SocketAddrV4) -> eyre::Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .wrap_err("Failed to open UDP socket")?;
    socket
        .set_broadcast(true)
        .wrap_err("Failed to enable broadcast")?;
    let sent = socket
        .send_to(packet, target)
        .await
        .wrap_err(format!("Failed to send magic packet to {target}"))?;
    debug!(%target, sent, "Magic packet sent");
    Ok(())
}
