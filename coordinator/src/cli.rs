//! Command-line interface definitions.
//!
//! This module contains the CLI argument parsing structures and enums
//! used by the `powerlan` binary.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use crate::roster::Selection;

/// Top-level command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "powerlan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wake, shut down and track the machines on your LAN.")]
pub struct Cli {
    /// Path to the configuration file (defaults to ./powerlan.toml when present)
    #[arg(short, long, global = true, env = "POWERLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Roster file to use instead of the configured one
    #[arg(long, global = true, env = "POWERLAN_ROSTER")]
    pub roster: Option<PathBuf>,

    /// Format of diagnostic output on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log line layouts supported by the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
    Pretty,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the roster.
    List,

    /// Add a host. Without --mac the address is looked up in the neighbor table.
    Add(AddArgs),

    /// Change the IP address, user or password of a host.
    Edit(EditArgs),

    /// Remove hosts by index.
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },

    /// Remove every host.
    Clear,

    /// Power hosts on via Wake-on-LAN.
    Wake(TargetArgs),

    /// Shut hosts down remotely.
    Shutdown(TargetArgs),

    /// Update recorded IPs from the neighbor table.
    Refresh,

    /// Print the MAC address currently cached for an IP.
    Resolve { ip: String },
}

/// Arguments for adding a host.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// IPv4 address of the host
    pub ip: String,
    /// MAC address (aa:bb:cc:dd:ee:ff, aa-bb-.. or aabbcc..)
    #[arg(long)]
    pub mac: Option<String>,
    /// Account used for the remote shutdown
    #[arg(long, default_value = "")]
    pub user: String,
    /// Password for --user
    #[arg(long, default_value = "", hide_default_value = true)]
    pub secret: String,
}

/// Arguments for editing a host in place. At least one change is required.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("change").required(true).multiple(true).args(["ip", "user", "secret"])))]
pub struct EditArgs {
    /// Roster index as shown by `list`
    pub index: usize,
    /// New IPv4 address
    #[arg(long)]
    pub ip: Option<String>,
    /// New account for the remote shutdown (empty to skip the credential check)
    #[arg(long)]
    pub user: Option<String>,
    /// New password for the account
    #[arg(long)]
    pub secret: Option<String>,
}

/// Which hosts an operation applies to.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Apply to every host in the roster
    #[arg(long, conflicts_with = "indices")]
    pub all: bool,
    /// Roster indices as shown by `list`
    #[arg(required_unless_present = "all")]
    pub indices: Vec<usize>,
}

impl TargetArgs {
    #[must_use]
    pub fn selection(&self) -> Selection {
        if self.all {
            Selection::All
        } else {
            Selection::Indices(self.indices.clone())
        }
    }
}
