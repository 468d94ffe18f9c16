//! Configuration data types and their defaults.
//!
//! Every key is optional; an absent file behaves like an empty one.

use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PowerlanConfig {
    /// Path of the roster CSV. Relative paths are resolved against the config file.
    #[serde(default = "default_roster_path")]
    pub roster: String,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub wol: WolConfig,
    #[serde(default)]
    pub commands: CommandTemplates,
}

impl Default for PowerlanConfig {
    fn default() -> Self {
        Self {
            roster: default_roster_path(),
            timeouts: Timeouts::default(),
            wol: WolConfig::default(),
            commands: CommandTemplates::default(),
        }
    }
}

/// Upper bounds for every externally imposed wait, in milliseconds.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Reachability check before a shutdown.
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,
    /// Cache-priming ping before a single MAC lookup.
    #[serde(default = "default_resolve_probe_ms")]
    pub resolve_probe_ms: u64,
    /// Credential validation and shutdown commands.
    #[serde(default = "default_command_ms")]
    pub command_ms: u64,
    /// Neighbor-table listing.
    #[serde(default = "default_command_ms")]
    pub neighbor_dump_ms: u64,
}

impl Timeouts {
    #[must_use]
    pub const fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    #[must_use]
    pub const fn resolve_probe(&self) -> Duration {
        Duration::from_millis(self.resolve_probe_ms)
    }

    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_millis(self.command_ms)
    }

    #[must_use]
    pub const fn neighbor_dump(&self) -> Duration {
        Duration::from_millis(self.neighbor_dump_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_ms: default_probe_ms(),
            resolve_probe_ms: default_resolve_probe_ms(),
            command_ms: default_command_ms(),
            neighbor_dump_ms: default_command_ms(),
        }
    }
}

/// Where magic packets are broadcast to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WolConfig {
    #[serde(default = "default_broadcast")]
    pub broadcast: Ipv4Addr,
    #[serde(default = "default_wol_port")]
    pub port: u16,
}

impl WolConfig {
    #[must_use]
    pub const fn target(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.broadcast, self.port)
    }
}

impl Default for WolConfig {
    fn default() -> Self {
        Self {
            broadcast: default_broadcast(),
            port: default_wol_port(),
        }
    }
}

/// Command-line templates run through the platform shell.
///
/// `{ip}`, `{user}` and `{secret}` are substituted before execution. `{user}`
/// and `{secret}` arrive already quoted for the shell, so templates must not
/// quote them again.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommandTemplates {
    /// Checks the credentials against the target's admin share.
    #[serde(default = "default_validate_command")]
    pub validate: String,
    /// Requests an immediate remote power-off.
    #[serde(default = "default_shutdown_command")]
    pub shutdown: String,
    /// Lists the neighbor table. When unset the platform default source is used.
    #[serde(default)]
    pub neighbor_dump: Option<String>,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            validate: default_validate_command(),
            shutdown: default_shutdown_command(),
            neighbor_dump: None,
        }
    }
}

fn default_roster_path() -> String {
    "./computers.csv".to_string()
}

const fn default_probe_ms() -> u64 {
    1000
}

const fn default_resolve_probe_ms() -> u64 {
    100
}

const fn default_command_ms() -> u64 {
    5000
}

const fn default_broadcast() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

const fn default_wol_port() -> u16 {
    9
}

#[cfg(windows)]
fn default_validate_command() -> String {
    r"net use \\{ip}\ipc$ {secret} /user:{user}".to_string()
}

#[cfg(not(windows))]
fn default_validate_command() -> String {
    "smbclient //{ip}/IPC$ -U {user}%{secret} -c exit".to_string()
}

#[cfg(windows)]
fn default_shutdown_command() -> String {
    r"shutdown /s /m \\{ip} /t 0".to_string()
}

#[cfg(not(windows))]
fn default_shutdown_command() -> String {
    "net rpc shutdown -I {ip} -U {user}%{secret} -t 0 -f".to_string()
}

/// Resolves `relative_path` against the directory holding the config file.
///
/// Absolute paths are returned unchanged. `.` and `..` are folded lexically,
/// so the roster file does not need to exist yet.
#[must_use]
pub fn resolve_config_relative_path(config_path: &Path, relative_path: &str) -> PathBuf {
    let path = Path::new(relative_path);
    if path.is_absolute() {
        return fold_dots(path);
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new(""));
    fold_dots(&base.join(path))
}

fn fold_dots(path: &Path) -> PathBuf {
    path.components().fold(PathBuf::new(), |mut out, component| {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
        out
    })
}
