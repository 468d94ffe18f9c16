//! Human-facing status vocabulary shown next to each roster entry.

use core::fmt;

/// Status tag of a single host, as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostStatus {
    #[default]
    Unknown,
    Checking,
    HostUnreachable,
    Authenticating,
    AuthFailed,
    ShuttingDown,
    ShutdownDone,
    ShutdownCommandFailed,
    ShutdownFailed,
    PowerOnSent,
    PowerOnFailed,
    PowerOnFailedNoMac,
}

impl HostStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        use HostStatus as S;
        match self {
            S::Unknown => "unknown",
            S::Checking => "checking",
            S::HostUnreachable => "host-unreachable",
            S::Authenticating => "authenticating",
            S::AuthFailed => "auth-failed",
            S::ShuttingDown => "shutting-down",
            S::ShutdownDone => "shutdown-done",
            S::ShutdownCommandFailed => "shutdown-command-failed",
            S::ShutdownFailed => "shutdown-failed",
            S::PowerOnSent => "power-on-sent",
            S::PowerOnFailed => "power-on-failed",
            S::PowerOnFailedNoMac => "power-on-failed-no-mac",
        }
    }

    /// Whether no further update is expected for the current operation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::Checking | Self::Authenticating | Self::ShuttingDown
        )
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
