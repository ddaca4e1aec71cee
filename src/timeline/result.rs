//! Run results and outcomes

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;

use super::events::CheckpointEvent;
use crate::errors::ConfigurationError;

/// Results accumulated so far, keyed by step id in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Results(IndexMap<String, Value>);

impl Results {
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    /// Look up a result that must exist.
    ///
    /// Extension predicates use this so that a typo in a step id fails the
    /// run with a configuration error instead of silently reading nothing.
    pub fn require(&self, id: &str) -> Result<&Value, ConfigurationError> {
        self.0
            .get(id)
            .ok_or_else(|| ConfigurationError::UnknownStep { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, id: impl Into<String>, value: Value) {
        self.0.insert(id.into(), value);
    }
}

impl FromIterator<(String, Value)> for Results {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Plan name
    pub plan: String,
    /// Step id to result, main groups first, then the extension, then the epilogue
    pub results: Results,
    /// Every checkpoint event in the order it fired
    pub checkpoints: Vec<CheckpointEvent>,
    /// Whether the conditional extension ran
    pub extended: bool,
    /// Wall-clock time the run took
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunResult {
    /// Checkpoint events fired by one step, in order.
    pub fn checkpoints_for<'a>(&'a self, step_id: &'a str) -> impl Iterator<Item = &'a CheckpointEvent> {
        self.checkpoints.iter().filter(move |e| e.step_id == step_id)
    }
}

/// Terminal state of [`TimelinePlayer::execute`](super::TimelinePlayer::execute).
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunResult),
    /// The abort signal was raised; no result is produced
    Aborted,
}

impl RunOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted)
    }

    pub fn result(&self) -> Option<&RunResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            RunOutcome::Aborted => None,
        }
    }

    pub fn into_result(self) -> Option<RunResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            RunOutcome::Aborted => None,
        }
    }
}

pub(crate) fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
