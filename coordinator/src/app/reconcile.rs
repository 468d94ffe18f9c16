//! Refreshes stale roster IPs from the neighbor table.
//!
//! The recorded MAC is trusted: whatever IP the table currently associates
//! with it replaces the recorded one. Nothing checks that the table entry is
//! genuine.

use tracing::{debug, info};

use powerlan_common::NeighborTable;

use super::resolver::{NeighborSource, resolve_all};
use crate::roster::Roster;

/// Updates every record whose MAC appears in `table` with a different IP.
///
/// Returns the number of records changed. Records without a MAC are left alone.
pub fn reconcile(roster: &mut Roster, table: &NeighborTable) -> usize {
    let mut updated = 0;
    for (index, host) in roster.iter_mut().enumerate() {
        if host.mac.is_empty() {
            continue;
        }
        let Some(current) = table.ip_for(&host.mac) else {
            debug!(index, mac = %host.mac, "MAC not in neighbor table");
            continue;
        };
        if host.ip != current {
            info!(index, mac = %host.mac, old = %host.ip, new = %current, "Updating IP");
            current.clone_into(&mut host.ip);
            updated += 1;
        }
    }
    updated
}

/// Parses `dump` once and reconciles the roster against it.
pub fn reconcile_dump(roster: &mut Roster, dump: &str) -> usize {
    reconcile(roster, &NeighborTable::parse(dump))
}

/// Takes one neighbor snapshot and reconciles against it. Never fails: an
/// unreadable table updates nothing.
pub async fn refresh<N: NeighborSource>(roster: &mut Roster, neighbors: &N) -> usize {
    let table = resolve_all(neighbors).await;
    reconcile(roster, &table)
}
