//! MAC lookups against the local neighbor table.
//!
//! Both lookups read a full neighbor dump. A single lookup first pings the
//! target so the kernel has a fresh cache entry for it.

use core::future::Future;
use core::net::Ipv4Addr;
use core::time::Duration;

use tracing::debug;

use powerlan_common::{MacAddress, NeighborTable};

use super::probe::Probe;
use super::runner::{CommandLine, capture_output};

/// Produces a neighbor dump in the canonical `<ip> <aa-bb-..> <type>` line shape.
pub trait NeighborSource: Send + Sync + 'static {
    fn dump(&self) -> impl Future<Output = eyre::Result<String>> + Send;
}

/// The operating system's neighbor table, or an operator-supplied listing command.
#[derive(Debug, Clone)]
pub struct SystemNeighbors {
    command: Option<String>,
    limit: Duration,
}

impl SystemNeighbors {
    #[must_use]
    pub const fn new(command: Option<String>, limit: Duration) -> Self {
        Self { command, limit }
    }
}

impl NeighborSource for SystemNeighbors {
    async fn dump(&self) -> eyre::Result<String> {
        if let Some(ref command) = self.command {
            return capture_output(&CommandLine::plain(command.clone()), self.limit).await;
        }
        platform_dump(self.limit).await
    }
}

#[cfg(windows)]
async fn platform_dump(limit: Duration) -> eyre::Result<String> {
    capture_output(&CommandLine::plain("arp -a"), limit).await
}

#[cfg(target_os = "linux")]
async fn platform_dump(_limit: Duration) -> eyre::Result<String> {
    use eyre::WrapErr as _;

    let table = tokio::fs::read_to_string("/proc/net/arp")
        .await
        .wrap_err("Failed to read /proc/net/arp")?;
    Ok(powerlan_common::canonicalize_proc_net_arp(&table))
}

#[cfg(not(any(windows, target_os = "linux")))]
async fn platform_dump(_limit: Duration) -> eyre::Result<String> {
    eyre::bail!("no neighbor table source for this platform; set commands.neighbor_dump")
}

/// Looks up the hardware address currently cached for `ip`.
///
/// The ping only primes the cache: a host that drops ICMP may still have
/// answered ARP, so its result is not consulted. Returns `None` for an
/// unparseable IP, a cache miss or an unreadable table.
pub async fn resolve_single<P, N>(
    ip: &str,
    probe: &P,
    neighbors: &N,
    probe_limit: Duration,
) -> Option<MacAddress>
where
    P: Probe,
    N: NeighborSource,
{
    let Ok(addr) = ip.parse::<Ipv4Addr>() else {
        debug!(ip, "Not resolving unparseable IP");
        return None;
    };
    let addr = addr.to_string();
    let answered = probe.probe(&addr, probe_limit).await;
    debug!(ip = %addr, answered, "Primed neighbor cache");

    let dump = match neighbors.dump().await {
        Ok(dump) => dump,
        Err(e) => {
            debug!(ip = %addr, "Neighbor table unavailable: {e:#}");
            return None;
        }
    };
    let mac = NeighborTable::parse(&dump).mac_for(&addr);
    debug!(ip = %addr, ?mac, "Neighbor lookup finished");
    mac
}

/// Reads and parses the whole neighbor table. An unreadable table is treated as empty.
pub async fn resolve_all<N: NeighborSource>(neighbors: &N) -> NeighborTable {
    match neighbors.dump().await {
        Ok(dump) => NeighborTable::parse(&dump),
        Err(e) => {
            tracing::warn!("Neighbor table unavailable: {e:#}");
            NeighborTable::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves a fixed dump, or fails when none is set.
    pub(crate) struct FixedNeighbors(pub Option<&'static str>);

    impl NeighborSource for FixedNeighbors {
        async fn dump(&self) -> eyre::Result<String> {
            self.0
                .map(str::to_owned)
                .ok_or_else(|| eyre::eyre!("table unavailable"))
        }
    }

    pub(crate) struct CountingProbe {
        pub reachable: bool,
        pub calls: Arc<AtomicUsize>,
    }

    impl CountingProbe {
        pub(crate) fn new(reachable: bool) -> Self {
            Self {
                reachable,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Probe for CountingProbe {
        async fn probe(&self, _ip: &str, _limit: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    const DUMP: &str = "  10.0.0.7   aa-bb-cc-dd-ee-ff   dynamic\n  10.0.0.8   11-22-33-44-55-66   dynamic\n";
    const LIMIT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn resolves_after_probing() {
        let probe = CountingProbe::new(true);
        let mac = resolve_single("10.0.0.8", &probe, &FixedNeighbors(Some(DUMP)), LIMIT).await;
        assert_eq!(mac.map(|m| m.to_string()).as_deref(), Some("11:22:33:44:55:66"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn silent_host_can_still_resolve() {
        let probe = CountingProbe::new(false);
        let mac = resolve_single("10.0.0.7", &probe, &FixedNeighbors(Some(DUMP)), LIMIT).await;
        assert!(mac.is_some());
    }

    #[tokio::test]
    async fn failures_are_empty_not_errors() {
        let probe = CountingProbe::new(true);
        let table = FixedNeighbors(Some(DUMP));
        assert!(resolve_single("10.0.0.99", &probe, &table, LIMIT).await.is_none());
        assert!(resolve_single("not-an-ip", &probe, &table, LIMIT).await.is_none());
        assert!(
            resolve_single("10.0.0.7", &probe, &FixedNeighbors(None), LIMIT)
                .await
                .is_none()
        );
        // unparseable input never reaches the network
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolve_all_tolerates_missing_table() {
        assert!(resolve_all(&FixedNeighbors(None)).await.is_empty());
        assert_eq!(resolve_all(&FixedNeighbors(Some(DUMP))).await.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn configured_command_overrides_platform_source() {
        let source = SystemNeighbors::new(
            Some("echo '192.168.1.5   aa-bb-cc-dd-ee-ff   dynamic'".to_owned()),
            Duration::from_secs(5),
        );
        let table = resolve_all(&source).await;
        assert_eq!(table.ip_for("aa:bb:cc:dd:ee:ff"), Some("192.168.1.5"));
    }
}
