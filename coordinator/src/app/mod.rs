//! The host control and reconciliation engine.

mod control;
mod pipeline;
mod probe;
mod reconcile;
mod resolver;
mod runner;
mod sink;

pub use control::{PipelineHandle, PowerOnError, power_off, power_on, spawn_power_off, wake_host};
pub use pipeline::{HostPipeline, PipelineSettings, PipelineState};
pub use probe::{PingProbe, Probe};
pub use reconcile::{reconcile, reconcile_dump, refresh};
pub use resolver::{NeighborSource, SystemNeighbors, resolve_all, resolve_single};
pub use runner::{CommandLine, CommandOutcome, CommandRunner, ShellRunner, capture_output};
pub use sink::{StatusRx, StatusSink, StatusUpdate, apply_updates, channel};
