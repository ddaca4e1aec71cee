//! Declarative plan documents
//!
//! Plans can be written as TOML (default) or YAML (`.yaml` / `.yml`):
//!
//! ```toml
//! name = "research"
//!
//! [[groups]]
//! mode = "concurrent"
//! label = "Parallel discovery"
//!
//! [[groups.steps]]
//! id = "patent"
//! duration_ms = 4000
//! checkpoints = 6
//! labels = { "2" = "Tool call succeeded" }
//! result = "HIGH RISK"
//!
//! [extension]
//! when = [{ step = "patent", contains = "HIGH RISK" }]
//!
//! [extension.group]
//! mode = "sequential"
//! steps = [{ id = "ipstrategy", duration_ms = 3000, checkpoints = 6 }]
//! ```
//!
//! Explicit checkpoints are written as a list instead of a count:
//! `checkpoints = [{ at = 0.2, label = "Charts" }, { at = 1.0 }]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ConfigurationError, DreamlineError, Result};
use crate::timeline::{
    Checkpoint, Extension, ExtensionPredicate, GroupMode, Results, RunPlan, Step, StepGroup,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDocument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupDocument>,
    #[serde(default)]
    pub extension: Option<ExtensionDocument>,
    #[serde(default)]
    pub epilogue: Vec<GroupDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDocument {
    #[serde(default)]
    pub mode: GroupMode,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDocument {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub checkpoints: CheckpointsDocument,
    /// Labels keyed by 1-based checkpoint index
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckpointsDocument {
    Uniform(usize),
    Explicit(Vec<CheckpointDocument>),
}

impl Default for CheckpointsDocument {
    fn default() -> Self {
        CheckpointsDocument::Uniform(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointDocument {
    pub at: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDocument {
    #[serde(default)]
    pub label: Option<String>,
    /// All conditions must hold; an empty list always extends
    #[serde(default)]
    pub when: Vec<ConditionDocument>,
    pub group: GroupDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionDocument {
    pub step: String,
    pub contains: String,
}

/// Extends when every named step's result contains its needle.
///
/// String results are matched as-is; any other value is matched against
/// its JSON rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainsAll {
    conditions: Vec<ConditionDocument>,
}

impl ContainsAll {
    pub fn new(conditions: Vec<ConditionDocument>) -> Self {
        Self { conditions }
    }
}

impl ExtensionPredicate for ContainsAll {
    fn should_extend(&self, results: &Results) -> std::result::Result<bool, ConfigurationError> {
        for condition in &self.conditions {
            let value = results.require(&condition.step)?;
            let matched = match value {
                Value::String(s) => s.contains(&condition.contains),
                other => other.to_string().contains(&condition.contains),
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn referenced_steps(&self) -> Vec<String> {
        self.conditions.iter().map(|c| c.step.clone()).collect()
    }
}

impl PlanDocument {
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    pub fn from_yaml_str(s: &str) -> std::result::Result<Self, String> {
        serde_yaml::from_str(s).map_err(|e| e.to_string())
    }

    /// Read a plan document, choosing the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DreamlineError::PlanRead {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let parsed = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        parsed.map_err(|message| DreamlineError::PlanParse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Build the runtime plan. Structural checks that need the whole plan
    /// (ordering, uniqueness, references) are left to [`RunPlan::validate`].
    pub fn into_plan(self) -> std::result::Result<RunPlan, ConfigurationError> {
        let mut plan = RunPlan::new(self.name);
        if let Some(description) = self.description {
            plan = plan.with_description(description);
        }
        for group in self.groups {
            plan = plan.with_group(group.into_group()?);
        }
        if let Some(extension) = self.extension {
            let group = extension.group.into_group()?;
            let mut rule = Extension::when(Arc::new(ContainsAll::new(extension.when)), group);
            if let Some(label) = extension.label {
                rule = rule.with_label(label);
            }
            plan = plan.with_extension(rule);
        }
        for group in self.epilogue {
            plan = plan.with_epilogue(group.into_group()?);
        }
        Ok(plan)
    }
}

impl GroupDocument {
    fn into_group(self) -> std::result::Result<StepGroup, ConfigurationError> {
        let steps = self
            .steps
            .into_iter()
            .map(StepDocument::into_step)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let group = StepGroup::new(self.mode, steps);
        Ok(match self.label {
            Some(label) => group.with_label(label),
            None => group,
        })
    }
}

impl StepDocument {
    fn into_step(self) -> std::result::Result<Step, ConfigurationError> {
        let duration = Duration::from_millis(self.duration_ms);
        let mut step = match self.checkpoints {
            CheckpointsDocument::Uniform(n) => Step::uniform(&self.id, duration, n),
            CheckpointsDocument::Explicit(list) => {
                Step::new(&self.id, duration).with_checkpoints(list.into_iter().map(|c| {
                    Checkpoint {
                        fraction: c.at,
                        label: c.label,
                    }
                }))
            }
        };

        for (key, label) in self.labels {
            let index = key
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|i| *i >= 1)
                .ok_or_else(|| {
                    ConfigurationError::InvalidPlan(format!(
                        "step '{}': label key '{}' is not a 1-based checkpoint index",
                        self.id, key
                    ))
                })?;
            step = step.label_checkpoint(index - 1, label).ok_or_else(|| {
                ConfigurationError::InvalidPlan(format!(
                    "step '{}': no checkpoint {} to label",
                    self.id, index
                ))
            })?;
        }

        if let Some(name) = self.name {
            step = step.with_name(name);
        }
        Ok(step.with_result(self.result))
    }
}

/// Load, convert and validate a plan file.
pub fn load_plan(path: &Path) -> Result<RunPlan> {
    let plan = PlanDocument::load(path)?.into_plan()?;
    plan.validate()?;
    Ok(plan)
}
