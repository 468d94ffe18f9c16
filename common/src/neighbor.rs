//! Parsing of neighbor-table (ARP cache) dumps into a MAC to IP map.
//!
//! The canonical dump shape is the one printed by `arp -a` on Windows:
//!
//! ```text
//!   192.168.1.5           aa-bb-cc-dd-ee-ff     dynamic
//! ```
//!
//! Other platforms are translated into this shape before parsing (see
//! [`canonicalize_proc_net_arp`]).

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::LazyLock;

use regex::Regex;

use crate::mac::{MacAddress, normalize_mac};

static DUMP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)\s+((?:[0-9a-fA-F]{2}-){5}[0-9a-fA-F]{2})\s+",
    )
    .unwrap_or_else(|e| unreachable!("static neighbor pattern is valid: {e}"))
});

/// Snapshot of the neighbor table keyed by normalized MAC (`aa-bb-cc-dd-ee-ff`).
///
/// Built fresh for every resolve/reconcile pass and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborTable {
    by_mac: HashMap<String, String>,
    /// First MAC seen for each IP, for reverse lookups.
    by_ip: HashMap<String, String>,
}

impl NeighborTable {
    /// Parses a dump one line at a time. Lines that don't look like
    /// `<ipv4> <dashed-mac> ...` are skipped; on duplicate MACs the first IP wins,
    /// and on duplicate IPs the first MAC wins.
    #[must_use]
    pub fn parse(dump: &str) -> Self {
        let mut by_mac = HashMap::new();
        let mut by_ip = HashMap::new();
        for line in dump.split(['\r', '\n']).filter(|l| !l.is_empty()) {
            let Some(caps) = DUMP_LINE.captures(line) else {
                continue;
            };
            let (Some(ip), Some(mac)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let mac = mac.as_str().to_lowercase();
            if let Entry::Vacant(slot) = by_ip.entry(ip.as_str().to_owned()) {
                slot.insert(mac.clone());
            }
            if let Entry::Vacant(slot) = by_mac.entry(mac) {
                slot.insert(ip.as_str().to_owned());
            }
        }
        Self { by_mac, by_ip }
    }

    /// Looks up the IP for a roster MAC string, normalizing it first.
    #[must_use]
    pub fn ip_for(&self, mac: &str) -> Option<&str> {
        self.by_mac.get(&normalize_mac(mac)).map(String::as_str)
    }

    /// Reverse lookup: the hardware address currently recorded for `ip`.
    #[must_use]
    pub fn mac_for(&self, ip: &str) -> Option<MacAddress> {
        self.by_ip
            .get(ip)
            .and_then(|mac| MacAddress::parse_lenient(mac).ok())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_mac.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_mac.is_empty()
    }

    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        self.by_mac
    }
}

/// Translates the Linux `/proc/net/arp` table into canonical dump lines.
///
/// Incomplete entries (flags `0x0`) are dropped, so only active neighbors remain.
#[must_use]
pub fn canonicalize_proc_net_arp(table: &str) -> String {
    let mut out = String::new();
    for line in table.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let (Some(ip), Some(_hw_type), Some(flags), Some(mac)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if flags == "0x0" {
            continue;
        }
        out.push_str(ip);
        out.push(' ');
        out.push_str(&normalize_mac(mac));
        out.push_str(" dynamic\n");
    }
    out
}
