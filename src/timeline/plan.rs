//! Run plans and the conditional extension rule
//!
//! A plan is an ordered list of groups, an optional extension, and an
//! optional epilogue:
//!
//! ```text
//!   main groups ──▶ extension decision ──▶ [extension group] ──▶ epilogue
//!                   (evaluated once)       (at most one)
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::group::StepGroup;
use super::result::Results;
use super::step::Step;
use crate::errors::ConfigurationError;

/// Decides whether a plan gets its extension group.
pub trait ExtensionPredicate: Send + Sync {
    fn should_extend(&self, results: &Results) -> Result<bool, ConfigurationError>;

    /// Step ids the predicate reads, when known up front.
    ///
    /// Plan validation checks these against the main groups before the run
    /// starts.
    fn referenced_steps(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<F> ExtensionPredicate for F
where
    F: Fn(&Results) -> Result<bool, ConfigurationError> + Send + Sync,
{
    fn should_extend(&self, results: &Results) -> Result<bool, ConfigurationError> {
        self(results)
    }
}

/// Produces the extension group once the predicate has fired.
pub trait ExtensionFactory: Send + Sync {
    fn build(&self, results: &Results) -> Result<StepGroup, ConfigurationError>;
}

impl<F> ExtensionFactory for F
where
    F: Fn(&Results) -> Result<StepGroup, ConfigurationError> + Send + Sync,
{
    fn build(&self, results: &Results) -> Result<StepGroup, ConfigurationError> {
        self(results)
    }
}

/// A factory that always hands back the same group.
#[derive(Debug, Clone)]
pub struct FixedGroup(pub StepGroup);

impl ExtensionFactory for FixedGroup {
    fn build(&self, _results: &Results) -> Result<StepGroup, ConfigurationError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct Extension {
    predicate: Arc<dyn ExtensionPredicate>,
    factory: Arc<dyn ExtensionFactory>,
    label: Option<String>,
    /// Group known at definition time, used only for estimates
    preview: Option<StepGroup>,
}

impl Extension {
    /// Build an extension from a predicate closure and a factory closure.
    pub fn new<P, F>(predicate: P, factory: F) -> Self
    where
        P: Fn(&Results) -> Result<bool, ConfigurationError> + Send + Sync + 'static,
        F: Fn(&Results) -> Result<StepGroup, ConfigurationError> + Send + Sync + 'static,
    {
        Self::from_parts(Arc::new(predicate), Arc::new(factory))
    }

    pub fn from_parts(
        predicate: Arc<dyn ExtensionPredicate>,
        factory: Arc<dyn ExtensionFactory>,
    ) -> Self {
        Self {
            predicate,
            factory,
            label: None,
            preview: None,
        }
    }

    /// Append `group` whenever `predicate` holds.
    pub fn when(predicate: Arc<dyn ExtensionPredicate>, group: StepGroup) -> Self {
        Self {
            predicate,
            factory: Arc::new(FixedGroup(group.clone())),
            label: None,
            preview: Some(group),
        }
    }

    /// Unconditionally append `group`.
    pub fn always(group: StepGroup) -> Self {
        Self::when(
            Arc::new(|_: &Results| Ok::<_, ConfigurationError>(true)),
            group,
        )
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn preview(&self) -> Option<&StepGroup> {
        self.preview.as_ref()
    }

    pub fn referenced_steps(&self) -> Vec<String> {
        self.predicate.referenced_steps()
    }

    pub fn should_extend(&self, results: &Results) -> Result<bool, ConfigurationError> {
        self.predicate.should_extend(results)
    }

    pub fn build(&self, results: &Results) -> Result<StepGroup, ConfigurationError> {
        self.factory.build(results)
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("label", &self.label)
            .field("referenced_steps", &self.predicate.referenced_steps())
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

/// Ordered groups plus an optional extension and epilogue.
///
/// Plans are immutable once built and can be executed any number of times.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    name: String,
    description: Option<String>,
    groups: Vec<StepGroup>,
    extension: Option<Extension>,
    epilogue: Vec<StepGroup>,
}

impl RunPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: StepGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn with_epilogue(mut self, group: StepGroup) -> Self {
        self.epilogue.push(group);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn groups(&self) -> &[StepGroup] {
        &self.groups
    }

    pub fn extension(&self) -> Option<&Extension> {
        self.extension.as_ref()
    }

    pub fn epilogue(&self) -> &[StepGroup] {
        &self.epilogue
    }

    /// Steps declared up front (main groups and epilogue).
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.groups
            .iter()
            .chain(self.epilogue.iter())
            .flat_map(|g| g.steps().iter())
    }

    pub fn step_count(&self) -> usize {
        self.steps().count()
    }

    /// Plan-time duration of the main groups and epilogue, plus the
    /// previewed extension group when `with_extension` is set.
    pub fn estimated_duration(&self, with_extension: bool) -> Duration {
        let base = self
            .groups
            .iter()
            .chain(self.epilogue.iter())
            .map(StepGroup::planned_duration)
            .fold(Duration::ZERO, Duration::saturating_add);
        let extra = if with_extension {
            self.extension
                .as_ref()
                .and_then(Extension::preview)
                .map(StepGroup::planned_duration)
                .unwrap_or_default()
        } else {
            Duration::ZERO
        };
        base.saturating_add(extra)
    }

    /// Check every step, id uniqueness, and the extension's references.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for step in self.steps() {
            step.validate()?;
            if !seen.insert(step.id()) {
                return Err(ConfigurationError::DuplicateStep {
                    id: step.id().to_string(),
                });
            }
        }

        if let Some(extension) = &self.extension {
            let before_decision: HashSet<&str> =
                self.groups.iter().flat_map(StepGroup::step_ids).collect();
            for id in extension.referenced_steps() {
                if !before_decision.contains(id.as_str()) {
                    return Err(ConfigurationError::UnknownStep { id });
                }
            }
            if let Some(preview) = extension.preview() {
                self.validate_extension_group(preview)?;
            }
        }

        Ok(())
    }

    /// Check a synthesized extension group against the rest of the plan.
    pub fn validate_extension_group(&self, group: &StepGroup) -> Result<(), ConfigurationError> {
        let mut seen: HashSet<&str> = self.steps().map(Step::id).collect();
        for step in group.steps() {
            step.validate()?;
            if !seen.insert(step.id()) {
                return Err(ConfigurationError::DuplicateStep {
                    id: step.id().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::step::Checkpoint;
    use serde_json::json;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn research_plan() -> RunPlan {
        RunPlan::new("research")
            .with_group(StepGroup::concurrent([
                Step::uniform("patent", ms(400), 2).with_result("HIGH RISK"),
                Step::uniform("market", ms(300), 2).with_result("HIGH GROWTH"),
            ]))
            .with_epilogue(StepGroup::sequential([Step::uniform("report", ms(150), 3)]))
    }

    struct ReadsStep(&'static str);

    impl ExtensionPredicate for ReadsStep {
        fn should_extend(&self, results: &Results) -> Result<bool, ConfigurationError> {
            Ok(results.require(self.0)?.is_string())
        }

        fn referenced_steps(&self) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    #[test]
    fn test_valid_plan() {
        let plan = research_plan();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.step_count(), 3);
        assert_eq!(plan.estimated_duration(false), ms(550));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let plan = research_plan().with_group(StepGroup::sequential([Step::new("patent", ms(5))]));
        assert_eq!(
            plan.validate(),
            Err(ConfigurationError::DuplicateStep { id: "patent".into() })
        );
    }

    #[test]
    fn test_bad_checkpoints_rejected_by_plan() {
        let plan = RunPlan::new("bad").with_group(StepGroup::concurrent([Step::new("x", ms(10))
            .with_checkpoints([Checkpoint::new(0.5), Checkpoint::new(0.3)])]));
        assert!(matches!(
            plan.validate(),
            Err(ConfigurationError::NonIncreasingCheckpoints { .. })
        ));
    }

    #[test]
    fn test_extension_referencing_unknown_step_rejected() {
        let plan = research_plan().with_extension(Extension::when(
            Arc::new(ReadsStep("legal")),
            StepGroup::sequential([Step::new("ip", ms(10))]),
        ));
        assert_eq!(
            plan.validate(),
            Err(ConfigurationError::UnknownStep { id: "legal".into() })
        );
    }

    #[test]
    fn test_extension_cannot_reference_epilogue_step() {
        let plan = research_plan().with_extension(Extension::when(
            Arc::new(ReadsStep("report")),
            StepGroup::sequential([Step::new("ip", ms(10))]),
        ));
        assert!(matches!(
            plan.validate(),
            Err(ConfigurationError::UnknownStep { .. })
        ));
    }

    #[test]
    fn test_extension_preview_collision_rejected() {
        let plan = research_plan()
            .with_extension(Extension::always(StepGroup::sequential([Step::new("market", ms(10))])));
        assert_eq!(
            plan.validate(),
            Err(ConfigurationError::DuplicateStep { id: "market".into() })
        );
    }

    #[test]
    fn test_estimate_includes_preview() {
        let plan = research_plan().with_extension(Extension::always(StepGroup::sequential([
            Step::new("replan", ms(250)),
            Step::new("ip", ms(300)),
        ])));
        assert_eq!(plan.estimated_duration(false), ms(550));
        assert_eq!(plan.estimated_duration(true), ms(1100));
    }

    #[test]
    fn test_closure_extension() {
        let extension = Extension::new(
            |results: &Results| Ok(results.require("patent")? == &json!("HIGH RISK")),
            |_: &Results| Ok(StepGroup::sequential([Step::new("ip", ms(10))])),
        )
        .with_label("re-plan");

        let results: Results = [("patent".to_string(), json!("HIGH RISK"))]
            .into_iter()
            .collect();
        assert!(extension.should_extend(&results).unwrap());
        assert_eq!(extension.build(&results).unwrap().len(), 1);
        assert_eq!(extension.label(), Some("re-plan"));
        assert!(extension.preview().is_none());

        let empty = Results::default();
        assert!(extension.should_extend(&empty).is_err());
    }
}
