//! Per-host shutdown pipeline.
//!
//! ```text
//! Idle -> Probing -> Unreachable
//!                 -> Authenticating -> AuthFailed
//!                 -> Dispatching    -> Dispatched | DispatchFailed
//! ```
//!
//! Every stage is a separate await, so a cancellation check can be slotted in
//! between stages without restructuring.

use core::time::Duration;

use tracing::{debug, info, warn};

use powerlan_common::HostStatus;

use super::probe::Probe;
use super::runner::{CommandLine, CommandOutcome, CommandRunner};
use super::sink::StatusSink;
use crate::config::{CommandTemplates, Timeouts};
use crate::roster::HostTarget;

/// Position of a pipeline in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Probing,
    Unreachable,
    Authenticating,
    AuthFailed,
    Dispatching,
    Dispatched,
    DispatchFailed,
    /// The pipeline task died unexpectedly.
    Failed,
}

impl PipelineState {
    /// The status shown to the operator on entering this state.
    #[must_use]
    pub const fn status(self) -> Option<HostStatus> {
        use PipelineState as P;
        Some(match self {
            P::Idle => return None,
            P::Probing => HostStatus::Checking,
            P::Unreachable => HostStatus::HostUnreachable,
            P::Authenticating => HostStatus::Authenticating,
            P::AuthFailed => HostStatus::AuthFailed,
            P::Dispatching => HostStatus::ShuttingDown,
            P::Dispatched => HostStatus::ShutdownDone,
            P::DispatchFailed => HostStatus::ShutdownCommandFailed,
            P::Failed => HostStatus::ShutdownFailed,
        })
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Unreachable
                | Self::AuthFailed
                | Self::Dispatched
                | Self::DispatchFailed
                | Self::Failed
        )
    }
}

/// Deadlines and command templates shared by all pipelines of one request.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub probe_limit: Duration,
    pub command_limit: Duration,
    pub validate_template: String,
    pub shutdown_template: String,
}

impl PipelineSettings {
    #[must_use]
    pub fn new(timeouts: &Timeouts, commands: &CommandTemplates) -> Self {
        Self {
            probe_limit: timeouts.probe(),
            command_limit: timeouts.command(),
            validate_template: commands.validate.clone(),
            shutdown_template: commands.shutdown.clone(),
        }
    }
}

/// One shutdown attempt against one host.
pub struct HostPipeline<'run, P, R> {
    target: &'run HostTarget,
    probe: &'run P,
    runner: &'run R,
    settings: &'run PipelineSettings,
    sink: &'run StatusSink,
    state: PipelineState,
}

impl<'run, P: Probe, R: CommandRunner> HostPipeline<'run, P, R> {
    #[must_use]
    pub const fn new(
        target: &'run HostTarget,
        probe: &'run P,
        runner: &'run R,
        settings: &'run PipelineSettings,
        sink: &'run StatusSink,
    ) -> Self {
        Self {
            target,
            probe,
            runner,
            settings,
            sink,
            state: PipelineState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    fn enter(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "Pipeline transition");
        self.state = next;
        if let Some(status) = next.status() {
            self.sink.emit(self.target.index, status);
        }
    }

    /// Drives the pipeline to a terminal state and returns it.
    pub async fn run(mut self) -> PipelineState {
        self.enter(PipelineState::Probing);
        if !self
            .probe
            .probe(&self.target.ip, self.settings.probe_limit)
            .await
        {
            info!("Host unreachable");
            self.enter(PipelineState::Unreachable);
            return self.state;
        }

        if !self.target.username.is_empty() {
            self.enter(PipelineState::Authenticating);
            let outcome = self.run_template(&self.settings.validate_template).await;
            if outcome != CommandOutcome::Success {
                warn!(?outcome, user = %self.target.username, "Credential check failed");
                self.enter(PipelineState::AuthFailed);
                return self.state;
            }
        }

        self.enter(PipelineState::Dispatching);
        let outcome = self.run_template(&self.settings.shutdown_template).await;
        if outcome == CommandOutcome::Success {
            info!("Shutdown dispatched");
            self.enter(PipelineState::Dispatched);
        } else {
            warn!(?outcome, "Shutdown command failed");
            self.enter(PipelineState::DispatchFailed);
        }
        self.state
    }

    async fn run_template(&self, template: &str) -> CommandOutcome {
        let command = CommandLine::render(
            template,
            &self.target.ip,
            &self.target.username,
            &self.target.secret,
        );
        self.runner.run(&command, self.settings.command_limit).await
    }
}
