//! Step groups: concurrent or sequential batches of steps.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::step::Step;

/// How the members of a group are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// All members start together; the group finishes when the last one does
    #[default]
    Concurrent,
    /// Members run one after another
    Sequential,
}

impl std::fmt::Display for GroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupMode::Concurrent => write!(f, "concurrent"),
            GroupMode::Sequential => write!(f, "sequential"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepGroup {
    mode: GroupMode,
    label: Option<String>,
    steps: Vec<Step>,
}

impl StepGroup {
    pub fn new(mode: GroupMode, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            mode,
            label: None,
            steps: steps.into_iter().collect(),
        }
    }

    pub fn concurrent(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::new(GroupMode::Concurrent, steps)
    }

    pub fn sequential(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::new(GroupMode::Sequential, steps)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Step::id)
    }

    /// Duration of the group in plan time: the longest member when
    /// concurrent, the sum of members when sequential.
    pub fn planned_duration(&self) -> Duration {
        let durations = self.steps.iter().map(Step::duration);
        match self.mode {
            GroupMode::Concurrent => durations.max().unwrap_or_default(),
            GroupMode::Sequential => durations.fold(Duration::ZERO, Duration::saturating_add),
        }
    }
}
