//! Hardware address parsing and normalization.
//!
//! Roster entries carry MAC addresses as free-form strings (`aa:bb:..`,
//! `AA-BB-..` or bare hex). This module turns them into bytes and into the
//! canonical lower-case dash-separated form used as neighbor-table key.

use core::fmt;
use core::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error as ThisError;

/// Accepts six hex-byte groups separated by `:` or `-`, or twelve bare hex digits.
static VALID_MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$|^([0-9A-Fa-f]{12})$")
        .unwrap_or_else(|e| unreachable!("static MAC pattern is valid: {e}"))
});

/// Error raised when a string cannot be read as a 6-byte hardware address.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("malformed MAC address: {0:?}")]
pub struct MalformedAddress(pub String);

/// A 6-byte hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Lower-case, dash-separated form (`aa-bb-cc-dd-ee-ff`).
    #[must_use]
    pub fn to_neighbor_key(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Strips any `:`/`-` separators and decodes the remaining 12 hex digits.
    ///
    /// This is deliberately lenient about separator placement; use
    /// [`is_valid_mac`] to check user input for the strict shape first.
    pub fn parse_lenient(raw: &str) -> Result<Self, MalformedAddress> {
        let digits: String = raw.chars().filter(|&c| c != ':' && c != '-').collect();
        let mut bytes = [0_u8; 6];
        hex::decode_to_slice(&digits, &mut bytes)
            .map_err(|_| MalformedAddress(raw.to_owned()))?;
        Ok(Self(bytes))
    }
}

/// Formats as upper-case colon-separated hex, the way addresses are shown to operators.
impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = MalformedAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_mac(s) {
            return Err(MalformedAddress(s.to_owned()));
        }
        Self::parse_lenient(s)
    }
}

/// Returns `true` if `mac` has one of the accepted roster shapes.
#[must_use]
pub fn is_valid_mac(mac: &str) -> bool {
    VALID_MAC.is_match(mac)
}

/// Normalizes a roster MAC string to the neighbor-table key form.
///
/// Only `:` is rewritten; a bare 12-digit MAC stays undashed and therefore
/// never matches a dump entry.
#[must_use]
pub fn normalize_mac(mac: &str) -> String {
    mac.replace(':', "-").to_lowercase()
}
