//! I/O-free building blocks shared by the powerlan engine.
//!
//! This crate provides:
//! - MAC address validation and normalization
//! - Wake-on-LAN magic packet framing
//! - Neighbor-table (ARP cache) dump parsing
//! - The status vocabulary reported per host

mod mac;
mod neighbor;
mod packet;
mod status;

pub use mac::*;
pub use neighbor::*;
pub use packet::*;
pub use status::*;
