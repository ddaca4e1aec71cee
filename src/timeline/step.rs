//! Steps and checkpoints
//!
//! A step is the smallest timed unit on a timeline: it waits out its
//! duration, fires a checkpoint event at each configured fraction along the
//! way, and yields a result that was fixed when the step was defined.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::ConfigurationError;

/// A progress point within a step, at `fraction` of the step's duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub fraction: f64,
    pub label: Option<String>,
}

impl Checkpoint {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            label: None,
        }
    }

    pub fn labeled(fraction: f64, label: impl Into<String>) -> Self {
        Self {
            fraction,
            label: Some(label.into()),
        }
    }
}

/// A timed unit of simulated work producing one fixed result.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    id: String,
    name: String,
    duration: Duration,
    checkpoints: Vec<Checkpoint>,
    result: Value,
}

impl Step {
    /// Create a step with no checkpoints and a `null` result.
    pub fn new(id: impl Into<String>, duration: Duration) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            duration,
            checkpoints: Vec::new(),
            result: Value::Null,
        }
    }

    /// Create a step with `n` evenly spaced checkpoints at `i / n` for `i in 1..=n`.
    pub fn uniform(id: impl Into<String>, duration: Duration, n: usize) -> Self {
        let checkpoints = (1..=n).map(|i| Checkpoint::new(i as f64 / n as f64));
        Self::new(id, duration).with_checkpoints(checkpoints)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoints.push(checkpoint);
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: impl IntoIterator<Item = Checkpoint>) -> Self {
        self.checkpoints.extend(checkpoints);
        self
    }

    pub fn with_result(mut self, result: impl Into<Value>) -> Self {
        self.result = result.into();
        self
    }

    /// Attach a label to the checkpoint at `index` (zero-based).
    ///
    /// Returns `None` when the step has no checkpoint at that index.
    pub fn label_checkpoint(mut self, index: usize, label: impl Into<String>) -> Option<Self> {
        let checkpoint = self.checkpoints.get_mut(index)?;
        checkpoint.label = Some(label.into());
        Some(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    /// Offset from the step's start at which checkpoint `index` fires.
    pub fn offset_of(&self, index: usize) -> Option<Duration> {
        self.checkpoints
            .get(index)
            .map(|c| self.duration.mul_f64(c.fraction))
    }

    /// Check duration and checkpoint ordering.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.duration.is_zero() {
            return Err(ConfigurationError::NonPositiveDuration {
                step: self.id.clone(),
            });
        }

        let mut previous: Option<f64> = None;
        for (index, checkpoint) in self.checkpoints.iter().enumerate() {
            let fraction = checkpoint.fraction;
            if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                return Err(ConfigurationError::CheckpointOutOfRange {
                    step: self.id.clone(),
                    index,
                    fraction,
                });
            }
            if let Some(prev) = previous {
                if fraction <= prev {
                    return Err(ConfigurationError::NonIncreasingCheckpoints {
                        step: self.id.clone(),
                        index,
                        previous: prev,
                        fraction,
                    });
                }
            }
            previous = Some(fraction);
        }

        Ok(())
    }
}
