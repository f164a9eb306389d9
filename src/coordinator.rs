//! Command/status coordinator
//!
//! Owns the single "current status" slot and the outstanding-command state.
//! A command moves Pending -> Sent -> Completed | Failed | TimedOut; terminal
//! states are final and a retry is always a fresh command with a fresh
//! sequence number. Exactly one command may be Sent at a time; a second
//! enqueue is rejected with `Busy` rather than queued.
//!
//! Completion is never inferred from a socket reply. The coordinator watches
//! the telemetry stream while a command is outstanding and decides the
//! outcome from the frames alone.

use crate::command::{Command, CommandKind};
use crate::config::{ContinuumConfig, CoordinatorConfig};
use crate::error::CommandError;
use crate::status::{RobotMode, Status};
use crate::sweep::SweepPlan;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Terminal result of a command reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed { reason: String },
    TimedOut,
}

/// Per-frame verdict of a variant-specific completion test.
enum Progress {
    /// No decision yet, keep watching.
    Pending,
    /// Condition met outright.
    Complete,
    /// Condition met, but must hold for the debounce window.
    Settled,
    Failed(String),
}

pub struct Coordinator {
    /// Latest decoded status, replaced atomically on each frame.
    status_tx: watch::Sender<Option<Status>>,
    /// Serialized commands, drained by the session's socket writer.
    command_tx: mpsc::Sender<String>,
    shutdown_rx: watch::Receiver<bool>,
    config: CoordinatorConfig,
    continuum: Option<ContinuumConfig>,
    /// True while a command (or sweep) is between Sent and a terminal state.
    outstanding: AtomicBool,
    next_seq: Mutex<HashMap<u32, u64>>,
}

/// Clears the outstanding flag when an execute call returns, on every path.
struct OutstandingGuard<'a>(&'a AtomicBool);

impl Drop for OutstandingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        continuum: Option<ContinuumConfig>,
        command_tx: mpsc::Sender<String>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            status_tx: watch::Sender::new(None),
            command_tx,
            shutdown_rx,
            config,
            continuum,
            outstanding: AtomicBool::new(false),
            next_seq: Mutex::new(HashMap::new()),
        }
    }

    /// Install a freshly decoded status as the current one and wake any
    /// waiter. Called by the telemetry loop, nothing else mutates the slot.
    pub fn ingest(&self, status: Status) {
        self.status_tx.send_replace(Some(status));
    }

    /// Latest known status, if any frame has been received yet.
    pub fn current_status(&self) -> Option<Status> {
        self.status_tx.borrow().clone()
    }

    /// Run one command to a terminal state, or fail synchronously before it
    /// is ever sent. `sweep_cam` expands into its primitive moves, executed
    /// linearly with each step awaited to completion.
    pub async fn execute(&self, kind: CommandKind, origin_id: u32) -> Result<Outcome, CommandError> {
        if *self.shutdown_rx.borrow() {
            return Err(CommandError::Cancelled);
        }
        if self
            .outstanding
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            return Err(CommandError::Busy);
        }
        let _guard = OutstandingGuard(&self.outstanding);

        match kind {
            CommandKind::SweepCam { .. } => {
                let continuum = self.continuum.as_ref().ok_or_else(|| {
                    CommandError::UnsafePrecondition("continuum configuration not loaded".to_string())
                })?;
                let plan = SweepPlan::build(continuum);
                info!(steps = plan.len(), "starting continuum sweep");
                for (i, step) in plan.steps.into_iter().enumerate() {
                    match self.send_and_track(step, origin_id).await? {
                        Outcome::Completed => debug!(step = i, "sweep step completed"),
                        other => {
                            warn!(step = i, ?other, "sweep aborted");
                            return Ok(other);
                        }
                    }
                }
                Ok(Outcome::Completed)
            }
            primitive => self.send_and_track(primitive, origin_id).await,
        }
    }

    /// Transmit one primitive command and watch telemetry until a terminal
    /// state. The caller holds the outstanding flag.
    async fn send_and_track(
        &self,
        kind: CommandKind,
        origin_id: u32,
    ) -> Result<Outcome, CommandError> {
        // Safety precondition gate: motion never reaches Sent while the arm
        // is unpowered or braked, or before any telemetry has arrived.
        if kind.is_motion() {
            match self.status_tx.borrow().as_ref() {
                None => {
                    return Err(CommandError::UnsafePrecondition(
                        "no telemetry received yet".to_string(),
                    ))
                }
                Some(status) => {
                    status.safe_for_motion().map_err(CommandError::UnsafePrecondition)?
                }
            }
        }

        // Validate before the sequence number is committed so a rejected
        // command leaves no gap.
        let seq = self.peek_seq(origin_id);
        let command = Command::new(kind, origin_id, seq)?;

        // Subscribe before sending so no frame between send and wait is lost;
        // the pre-send frame is marked seen, completion needs a fresh one.
        let mut status_rx = self.status_tx.subscribe();
        status_rx.borrow_and_update();

        let line = command.serialize();
        self.command_tx
            .send(line)
            .await
            .map_err(|_| CommandError::ChannelClosed)?;
        self.commit_seq(origin_id);
        info!(
            name = command.name(),
            origin = origin_id,
            seq,
            "command sent"
        );

        let outcome = self.track(&command, status_rx).await?;
        match &outcome {
            Outcome::Completed => info!(name = command.name(), seq, "command completed"),
            Outcome::Failed { reason } => warn!(name = command.name(), seq, reason, "command failed"),
            Outcome::TimedOut => warn!(name = command.name(), seq, "command timed out"),
        }
        Ok(outcome)
    }

    /// Wait for the Sent command to reach a terminal state: evaluate the
    /// completion test on every new frame, bounded by the deadline, aborted
    /// early on shutdown. On timeout the arm is left exactly as is.
    async fn track(
        &self,
        command: &Command,
        mut status_rx: watch::Receiver<Option<Status>>,
    ) -> Result<Outcome, CommandError> {
        let deadline = Instant::now() + self.config.command_timeout();
        let debounce = self.config.debounce();
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut steady_since: Option<Instant> = None;

        loop {
            // Armed only while the settle condition holds; fires once it has
            // held for the full debounce window without interruption.
            let debounce_deadline = steady_since.map(|t0| t0 + debounce);
            let debounce_elapsed = async move {
                match debounce_deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        return Err(CommandError::ChannelClosed);
                    }
                    let status = status_rx.borrow_and_update().clone();
                    let Some(status) = status else { continue };
                    match evaluate(&command.kind, &status) {
                        Progress::Complete => return Ok(Outcome::Completed),
                        Progress::Failed(reason) => return Ok(Outcome::Failed { reason }),
                        Progress::Settled => {
                            steady_since.get_or_insert_with(Instant::now);
                        }
                        Progress::Pending => {
                            steady_since = None;
                        }
                    }
                }
                _ = debounce_elapsed => {
                    return Ok(Outcome::Completed);
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return Err(CommandError::Cancelled);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return Ok(Outcome::TimedOut);
                }
            }
        }
    }

    fn peek_seq(&self, origin_id: u32) -> u64 {
        let seqs = self.next_seq.lock().expect("sequence lock poisoned");
        seqs.get(&origin_id).copied().unwrap_or(0) + 1
    }

    fn commit_seq(&self, origin_id: u32) {
        let mut seqs = self.next_seq.lock().expect("sequence lock poisoned");
        *seqs.entry(origin_id).or_insert(0) += 1;
    }
}

/// Variant-specific completion test, evaluated against each newly arrived
/// status while the command is Sent.
fn evaluate(kind: &CommandKind, status: &Status) -> Progress {
    match kind {
        CommandKind::Power { is_on: true } => {
            if status.robot_mode.is_powered() {
                Progress::Complete
            } else {
                Progress::Pending
            }
        }
        CommandKind::Power { is_on: false } => {
            if status.robot_mode == RobotMode::NoPower {
                Progress::Complete
            } else {
                Progress::Pending
            }
        }
        CommandKind::Brakes { enable: true } => {
            if status.robot_mode == RobotMode::SecurityStopped {
                Progress::Complete
            } else {
                Progress::Pending
            }
        }
        CommandKind::Brakes { enable: false } => {
            if status.robot_mode == RobotMode::Running {
                Progress::Complete
            } else {
                Progress::Pending
            }
        }
        CommandKind::AutoInit => {
            if status.all_joints_running() {
                Progress::Complete
            } else {
                Progress::Pending
            }
        }
        CommandKind::AutoInitForce { force } => {
            // The force check overrides completion: a spike in the same
            // frame that would otherwise complete still fails the command.
            let max = status.max_joint_force();
            if max > *force {
                Progress::Failed(format!("force exceeded: {:.3} > {:.3}", max, force))
            } else if status.all_joints_running() {
                Progress::Complete
            } else {
                Progress::Pending
            }
        }
        // No motion involved; the next frame acknowledges the stream is live.
        CommandKind::SetHome => Progress::Complete,
        // Composite, expanded before tracking.
        CommandKind::SweepCam { .. } => Progress::Pending,
        // Motion commands settle when the whole arm is back in a steady
        // servo state; held for the debounce window before completing.
        CommandKind::MoveCam { .. }
        | CommandKind::MoveEffector { .. }
        | CommandKind::MoveJoints { .. }
        | CommandKind::JointMove { .. }
        | CommandKind::SetPosition { .. } => {
            if status.robot_mode == RobotMode::Running && status.all_joints_steady() {
                Progress::Settled
            } else {
                Progress::Pending
            }
        }
    }
}
