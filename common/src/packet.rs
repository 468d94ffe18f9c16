//! Wake-on-LAN magic packet framing.

use crate::mac::{MacAddress, MalformedAddress};

/// Number of times the target MAC is repeated after the sync stream.
const MAC_REPETITIONS: usize = 16;
/// Length of the leading `0xFF` sync stream.
const SYNC_LEN: usize = 6;

/// Total size of a magic packet in bytes.
pub const MAGIC_PACKET_LEN: usize = SYNC_LEN + MAC_REPETITIONS * 6;

/// A ready-to-send magic packet: 6 bytes of `0xFF` followed by the target MAC 16 times.
pub type MagicPacket = [u8; MAGIC_PACKET_LEN];

/// Frames a magic packet for an already parsed address.
#[must_use]
pub fn magic_packet_for(mac: MacAddress) -> MagicPacket {
    let mut packet = [0xFF_u8; MAGIC_PACKET_LEN];
    let octets = mac.octets();
    for (byte, value) in packet.iter_mut().skip(SYNC_LEN).zip(octets.iter().cycle()) {
        *byte = *value;
    }
    packet
}

/// Builds a magic packet from a textual MAC address.
///
/// Separators (`:` and `-`) are stripped before the 12 hex digits are decoded.
///
/// # Errors
///
/// Returns [`MalformedAddress`] if the remaining text is not exactly 12 hex digits.
pub fn build_magic_packet(mac: &str) -> Result<MagicPacket, MalformedAddress> {
    MacAddress::parse_lenient(mac).map(magic_packet_for)
}
