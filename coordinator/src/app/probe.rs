//! ICMP reachability check.
//!
//! Raw ICMP sockets need elevated privileges on most systems, so the echo is
//! delegated to the platform `ping` binary and bounded by a hard timeout.

use core::future::Future;
use core::time::Duration;
use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Reports whether a host answers within a deadline. Never fails.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, ip: &str, limit: Duration) -> impl Future<Output = bool> + Send;
}

/// Sends a single echo request via the system `ping`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingProbe;

impl PingProbe {
    fn command(ip: &str, limit: Duration) -> Command {
        let mut cmd = Command::new("ping");
        #[cfg(windows)]
        cmd.arg("-n").arg("1").arg("-w").arg(limit.as_millis().to_string());
        #[cfg(target_os = "macos")]
        cmd.arg("-c").arg("1").arg("-W").arg(limit.as_millis().to_string());
        // iputils only takes whole seconds
        #[cfg(not(any(windows, target_os = "macos")))]
        cmd.arg("-c")
            .arg("1")
            .arg("-W")
            .arg(limit.as_secs().max(1).to_string());
        cmd.arg(ip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Probe for PingProbe {
    async fn probe(&self, ip: &str, limit: Duration) -> bool {
        if ip.is_empty() || ip.starts_with('-') {
            debug!(ip, "Refusing to probe suspicious target");
            return false;
        }
        match timeout(limit, Self::command(ip, limit).status()).await {
            Ok(Ok(status)) => {
                debug!(ip, ?status, "ping finished");
                status.success()
            }
            Ok(Err(e)) => {
                debug!(ip, "Failed to run ping: {e}");
                false
            }
            Err(_) => {
                debug!(ip, ?limit, "ping timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn option_like_targets_are_unreachable() {
        assert!(!PingProbe.probe("-f", Duration::from_millis(50)).await);
        assert!(!PingProbe.probe("", Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn never_exceeds_deadline() {
        // TEST-NET-1 is never routed; whatever ping does, we must return in time.
        let limit = Duration::from_millis(200);
        let started = tokio::time::Instant::now();
        assert!(!PingProbe.probe("192.0.2.1", limit).await);
        assert!(started.elapsed() < limit + Duration::from_millis(500));
    }
}
