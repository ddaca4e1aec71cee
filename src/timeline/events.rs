//! Player events
//!
//! Everything the player does is announced on an optional unbounded channel
//! so a view layer can follow along while `execute` is still running.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

use super::group::GroupMode;
use super::result::serialize_millis;

/// A checkpoint that fired during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointEvent {
    pub step_id: String,
    /// Zero-based checkpoint index within the step
    pub index: usize,
    /// Number of checkpoints the step has
    pub total: usize,
    pub fraction: f64,
    pub label: Option<String>,
    /// Plan-time position since the run started; not scaled by speed
    #[serde(rename = "at_ms", serialize_with = "serialize_millis")]
    pub at: Duration,
}

impl CheckpointEvent {
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Which part of the plan a group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Main,
    Extension,
    Epilogue,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Main => write!(f, "main"),
            Phase::Extension => write!(f, "extension"),
            Phase::Epilogue => write!(f, "epilogue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    RunStarted {
        plan: String,
        steps: usize,
    },
    GroupStarted {
        index: usize,
        phase: Phase,
        mode: GroupMode,
        label: Option<String>,
        steps: Vec<String>,
    },
    StepStarted {
        step_id: String,
        name: String,
        duration: Duration,
    },
    Checkpoint(CheckpointEvent),
    StepCompleted {
        step_id: String,
        result: Value,
        elapsed: Duration,
    },
    GroupCompleted {
        index: usize,
        phase: Phase,
        elapsed: Duration,
    },
    ExtensionTriggered {
        label: Option<String>,
        steps: Vec<String>,
    },
    RunCompleted {
        elapsed: Duration,
        extended: bool,
    },
    RunAborted,
}

pub type EventSender = mpsc::UnboundedSender<PlayerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;
