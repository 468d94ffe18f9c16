//! Entry points for operator-triggered power operations.
//!
//! Power-on walks the selected hosts one after another; sending a datagram
//! doesn't block long enough to be worth parallelizing. Power-off starts one
//! independent pipeline task per host; they complete in any order.

use alloc::sync::Arc;

use thiserror::Error as ThisError;
use tokio::task::JoinHandle;
use tracing::{Instrument as _, error, info, info_span, warn};

use powerlan_common::{HostStatus, MalformedAddress, build_magic_packet};

use super::pipeline::{HostPipeline, PipelineSettings, PipelineState};
use super::probe::Probe;
use super::runner::CommandRunner;
use super::sink::StatusSink;
use crate::roster::HostTarget;
use crate::wol::WakeSender;

/// Reasons a single host could not be woken.
#[derive(Debug, ThisError)]
pub enum PowerOnError {
    #[error("no MAC address recorded")]
    NoMac,
    #[error(transparent)]
    Malformed(#[from] MalformedAddress),
    #[error("failed to send magic packet")]
    Transport(#[source] eyre::Report),
}

impl PowerOnError {
    #[must_use]
    pub const fn status(&self) -> HostStatus {
        match *self {
            Self::NoMac => HostStatus::PowerOnFailedNoMac,
            Self::Malformed(_) | Self::Transport(_) => HostStatus::PowerOnFailed,
        }
    }
}

/// Builds and sends the magic packet for one host.
///
/// # Errors
///
/// See [`PowerOnError`].
pub async fn wake_host<W: WakeSender>(target: &HostTarget, sender: &W) -> Result<(), PowerOnError> {
    if target.mac.trim().is_empty() {
        return Err(PowerOnError::NoMac);
    }
    let packet = build_magic_packet(&target.mac)?;
    sender.send(&packet).await.map_err(PowerOnError::Transport)
}

/// Wakes every target in order, reporting each result to `sink`.
///
/// A failing host never stops the remaining ones. Returns the number of packets sent.
pub async fn power_on<W: WakeSender>(targets: &[HostTarget], sender: &W, sink: &StatusSink) -> usize {
    let mut sent = 0;
    for target in targets {
        let status = match wake_host(target, sender).await {
            Ok(()) => {
                info!(index = target.index, mac = %target.mac, "Power-on command sent");
                sent += 1;
                HostStatus::PowerOnSent
            }
            Err(e) => {
                warn!(index = target.index, ip = %target.ip, "Power-on failed: {e:#}");
                e.status()
            }
        };
        sink.emit(target.index, status);
    }
    sent
}

/// Handle to one running shutdown pipeline.
pub struct PipelineHandle {
    index: usize,
    sink: StatusSink,
    task: JoinHandle<PipelineState>,
}

impl PipelineHandle {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Waits for the pipeline. A task that panicked is reported as
    /// [`PipelineState::Failed`] instead of propagating.
    pub async fn join(self) -> PipelineState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                error!(index = self.index, "Shutdown pipeline aborted: {e}");
                self.sink
                    .emit(self.index, PipelineState::Failed.status().unwrap_or_default());
                PipelineState::Failed
            }
        }
    }
}

/// Starts one pipeline per target on the runtime and returns their handles
/// in submission order.
pub fn spawn_power_off<P, R>(
    targets: Vec<HostTarget>,
    probe: &Arc<P>,
    runner: &Arc<R>,
    settings: &Arc<PipelineSettings>,
    sink: &StatusSink,
) -> Vec<PipelineHandle>
where
    P: Probe,
    R: CommandRunner,
{
    targets
        .into_iter()
        .map(|target| {
            let index = target.index;
            let span = info_span!("shutdown", index, ip = %target.ip);
            let probe = Arc::clone(probe);
            let runner = Arc::clone(runner);
            let settings = Arc::clone(settings);
            let task_sink = sink.clone();
            let task = tokio::spawn(
                async move {
                    HostPipeline::new(&target, &*probe, &*runner, &settings, &task_sink)
                        .run()
                        .await
                }
                .instrument(span),
            );
            PipelineHandle {
                index,
                sink: sink.clone(),
                task,
            }
        })
        .collect()
}

/// Shuts down every target concurrently and waits for all of them.
///
/// Returns `(index, final state)` pairs in submission order; the pipelines
/// themselves finish in whatever order the hosts respond.
pub async fn power_off<P, R>(
    targets: Vec<HostTarget>,
    probe: Arc<P>,
    runner: Arc<R>,
    settings: Arc<PipelineSettings>,
    sink: StatusSink,
) -> Vec<(usize, PipelineState)>
where
    P: Probe,
    R: CommandRunner,
{
    let handles = spawn_power_off(targets, &probe, &runner, &settings, &sink);
    drop(sink);
    let mut finished = Vec::with_capacity(handles.len());
    for handle in handles {
        let index = handle.index();
        finished.push((index, handle.join().await));
    }
    finished
}
