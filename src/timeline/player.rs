//! Timeline Player
//!
//! Plays a [`RunPlan`] against the tokio clock. Concurrent steps are polled
//! together inside the `execute` future, so a run never spawns tasks and
//! dropping the future stops everything.
//!
//! Suspension points are limited to checkpoint deadlines, step end deadlines
//! and group fan-in barriers; each of them also watches the abort signal.

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::abort::{self, AbortHandle, AbortSignal};
use super::events::{CheckpointEvent, EventReceiver, EventSender, Phase, PlayerEvent};
use super::group::{GroupMode, StepGroup};
use super::plan::RunPlan;
use super::result::{Results, RunOutcome, RunResult};
use super::step::Step;
use crate::errors::ConfigurationError;
use crate::observability::telemetry::sanitize_for_log;

/// Slowest accepted playback speed. Anything slower stretches a
/// millisecond step past what the clock can represent.
pub const MIN_SPEED: f64 = 1e-3;

/// Playback settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    /// Time scale (1.0 = plan time, 2.0 = twice as fast)
    pub speed: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

impl PlayerConfig {
    /// Faster playback for rehearsals
    pub fn fast() -> Self {
        Self { speed: 4.0 }
    }

    /// Slower playback for presentations
    pub fn presentation() -> Self {
        Self { speed: 0.75 }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.speed.is_finite() && self.speed >= MIN_SPEED {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidSpeed { speed: self.speed })
        }
    }

    /// Wall-clock length of a plan-time span, or `None` when it does not
    /// fit in a `Duration`.
    fn scale(&self, d: Duration) -> Option<Duration> {
        Duration::try_from_secs_f64(d.as_secs_f64() / self.speed).ok()
    }
}

pub struct TimelinePlayer {
    config: PlayerConfig,
    abort_handle: AbortHandle,
    abort_signal: AbortSignal,
    events: Option<EventSender>,
}

impl TimelinePlayer {
    pub fn new(config: PlayerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let (abort_handle, abort_signal) = abort::channel();
        Ok(Self {
            config,
            abort_handle,
            abort_signal,
            events: None,
        })
    }

    /// Send events to an existing channel.
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.events = Some(tx);
        self
    }

    /// Create an event channel and return its receiving end.
    ///
    /// Replaces any previously configured sender.
    pub fn subscribe(&mut self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Validate `plan`, then play it to completion or until aborted.
    ///
    /// Configuration errors are reported before any timer starts. An abort
    /// is not an error: it yields [`RunOutcome::Aborted`].
    pub async fn execute(&self, plan: &RunPlan) -> Result<RunOutcome, ConfigurationError> {
        plan.validate()?;

        let origin = Instant::now();
        let horizon = self
            .config
            .scale(plan.estimated_duration(true))
            .and_then(|total| origin.checked_add(total))
            .ok_or_else(|| {
                ConfigurationError::InvalidPlan(format!(
                    "plan '{}' is too long to schedule at speed {}",
                    plan.name(),
                    self.config.speed
                ))
            })?;

        let run = Run {
            config: self.config,
            origin,
            horizon,
            abort: self.abort_signal.clone(),
            events: self.events.clone(),
            log: Mutex::new(Vec::new()),
        };

        let span = info_span!("run", plan = %sanitize_for_log(plan.name()));
        async {
            run.emit(PlayerEvent::RunStarted {
                plan: plan.name().to_string(),
                steps: plan.step_count(),
            });
            info!(steps = plan.step_count(), speed = self.config.speed, "Run started");

            match run.run_plan(plan).await {
                Ok(result) => {
                    info!(
                        elapsed_ms = result.elapsed.as_millis() as u64,
                        extended = result.extended,
                        "Run completed"
                    );
                    run.emit(PlayerEvent::RunCompleted {
                        elapsed: result.elapsed,
                        extended: result.extended,
                    });
                    Ok(RunOutcome::Completed(result))
                }
                Err(Halt::Aborted) => {
                    warn!("Run aborted");
                    run.emit(PlayerEvent::RunAborted);
                    Ok(RunOutcome::Aborted)
                }
                Err(Halt::Config(e)) => {
                    error!(error = %e, "Run stopped by configuration error");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// The abort signal was observed.
#[derive(Debug)]
struct Aborted;

#[derive(Debug)]
enum Halt {
    Aborted,
    Config(ConfigurationError),
}

impl From<Aborted> for Halt {
    fn from(_: Aborted) -> Self {
        Halt::Aborted
    }
}

impl From<ConfigurationError> for Halt {
    fn from(e: ConfigurationError) -> Self {
        Halt::Config(e)
    }
}

/// State owned by a single `execute` call.
struct Run {
    config: PlayerConfig,
    origin: Instant,
    /// Latest deadline the plan can need; clamps deadlines of synthesized groups
    horizon: Instant,
    abort: AbortSignal,
    events: Option<EventSender>,
    log: Mutex<Vec<CheckpointEvent>>,
}

impl Run {
    fn emit(&self, event: PlayerEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    /// Wall-clock deadline for a plan-time offset from `start`.
    fn deadline(&self, start: Instant, offset: Duration) -> Instant {
        self.config
            .scale(offset)
            .and_then(|scaled| start.checked_add(scaled))
            .unwrap_or(self.horizon)
    }

    fn check_abort(&self) -> Result<(), Aborted> {
        if self.abort.is_raised() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    async fn wait_until(&self, deadline: Instant, abort: &mut AbortSignal) -> Result<(), Aborted> {
        tokio::select! {
            biased;
            _ = abort.raised() => return Err(Aborted),
            _ = sleep_until(deadline) => {}
        }
        self.check_abort()
    }

    /// Append to the checkpoint log unless the run has been aborted.
    fn record(&self, event: CheckpointEvent) -> Result<(), Aborted> {
        {
            let mut log = self.log.lock();
            self.check_abort()?;
            log.push(event.clone());
        }
        self.emit(PlayerEvent::Checkpoint(event));
        Ok(())
    }

    async fn run_plan(&self, plan: &RunPlan) -> Result<RunResult, Halt> {
        let mut results = Results::default();
        let mut index = 0;
        // Plan-time position of the next group, unscaled by speed
        let mut clock = Duration::ZERO;

        for group in plan.groups() {
            self.run_group(index, Phase::Main, group, clock, &mut results)
                .await?;
            clock = clock.saturating_add(group.planned_duration());
            index += 1;
        }

        let mut extended = false;
        if let Some(extension) = plan.extension() {
            self.check_abort()?;
            // Evaluated exactly once; the extension group never re-checks it.
            if extension.should_extend(&results)? {
                let group = extension.build(&results)?;
                plan.validate_extension_group(&group)?;
                extended = true;

                let label = extension.label().map(sanitize_for_log);
                info!(
                    steps = group.len(),
                    label = label.as_deref(),
                    "Extension triggered"
                );
                self.emit(PlayerEvent::ExtensionTriggered {
                    label: extension.label().map(str::to_string),
                    steps: group.step_ids().map(str::to_string).collect(),
                });

                self.run_group(index, Phase::Extension, &group, clock, &mut results)
                    .await?;
                clock = clock.saturating_add(group.planned_duration());
                index += 1;
            } else {
                debug!("Extension predicate declined");
            }
        }

        for group in plan.epilogue() {
            self.run_group(index, Phase::Epilogue, group, clock, &mut results)
                .await?;
            clock = clock.saturating_add(group.planned_duration());
            index += 1;
        }

        let checkpoints = std::mem::take(&mut *self.log.lock());
        Ok(RunResult {
            plan: plan.name().to_string(),
            results,
            checkpoints,
            extended,
            elapsed: self.origin.elapsed(),
        })
    }

    async fn run_group(
        &self,
        index: usize,
        phase: Phase,
        group: &StepGroup,
        plan_start: Duration,
        results: &mut Results,
    ) -> Result<(), Aborted> {
        self.check_abort()?;

        let span = info_span!("group", index, phase = %phase, mode = %group.mode());
        async {
            let start = Instant::now();
            self.emit(PlayerEvent::GroupStarted {
                index,
                phase,
                mode: group.mode(),
                label: group.label().map(str::to_string),
                steps: group.step_ids().map(str::to_string).collect(),
            });

            match group.mode() {
                GroupMode::Sequential => {
                    let mut step_start = plan_start;
                    for step in group.steps() {
                        let value = self.run_step(step, step_start).await?;
                        results.insert(step.id(), value);
                        step_start = step_start.saturating_add(step.duration());
                    }
                }
                GroupMode::Concurrent => {
                    let mut pending: FuturesUnordered<_> = group
                        .steps()
                        .iter()
                        .enumerate()
                        .map(|(slot, step)| async move {
                            (slot, self.run_step(step, plan_start).await)
                        })
                        .collect();

                    // Fan-in barrier: the group is done once every member has reported.
                    let mut completed = 0usize;
                    let mut values: Vec<Option<Value>> = vec![None; group.len()];
                    while let Some((slot, outcome)) = pending.next().await {
                        values[slot] = Some(outcome?);
                        completed += 1;
                    }
                    debug_assert_eq!(completed, group.len());

                    for (step, value) in group.steps().iter().zip(values) {
                        if let Some(value) = value {
                            results.insert(step.id(), value);
                        }
                    }
                }
            }

            let elapsed = start.elapsed();
            info!(elapsed_ms = elapsed.as_millis() as u64, "Group completed");
            self.emit(PlayerEvent::GroupCompleted {
                index,
                phase,
                elapsed,
            });
            Ok::<(), Aborted>(())
        }
        .instrument(span)
        .await
    }

    /// `plan_start` is where the step begins on the unscaled plan clock;
    /// checkpoint `at` values are reported against it.
    async fn run_step(&self, step: &Step, plan_start: Duration) -> Result<Value, Aborted> {
        let span = info_span!("step", step_id = %sanitize_for_log(step.id()));
        async {
            self.check_abort()?;
            let mut abort = self.abort.clone();
            let start = Instant::now();

            self.emit(PlayerEvent::StepStarted {
                step_id: step.id().to_string(),
                name: step.name().to_string(),
                duration: step.duration(),
            });

            let total = step.checkpoints().len();
            for (index, checkpoint) in step.checkpoints().iter().enumerate() {
                let offset = step.offset_of(index).unwrap_or_default();
                self.wait_until(self.deadline(start, offset), &mut abort)
                    .await?;

                let label = checkpoint.label.as_deref().map(sanitize_for_log);
                debug!(
                    index,
                    fraction = checkpoint.fraction,
                    label = label.as_deref(),
                    "Checkpoint"
                );
                self.record(CheckpointEvent {
                    step_id: step.id().to_string(),
                    index,
                    total,
                    fraction: checkpoint.fraction,
                    label: checkpoint.label.clone(),
                    at: plan_start.saturating_add(offset),
                })?;
            }

            // The full duration is always waited out, checkpoints or not.
            self.wait_until(self.deadline(start, step.duration()), &mut abort)
                .await?;

            let elapsed = start.elapsed();
            info!(elapsed_ms = elapsed.as_millis() as u64, "Step completed");
            self.emit(PlayerEvent::StepCompleted {
                step_id: step.id().to_string(),
                result: step.result().clone(),
                elapsed,
            });
            Ok::<Value, Aborted>(step.result().clone())
        }
        .instrument(span)
        .await
    }
}
