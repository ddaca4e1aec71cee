//! Unit tests for plan documents
//!
//! Tests cover:
//! - Loading the bundled demo plan
//! - TOML and YAML documents describing the same plan
//! - Rejection of malformed plans with the right error

use std::path::Path;
use std::time::Duration;

use dreamline::errors::{get_exit_code, ConfigurationError, DreamlineError, EXIT_CONFIG_ERROR};
use dreamline::plan_file::{load_plan, PlanDocument};
use dreamline::timeline::GroupMode;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

mod demo_tests {
    use super::*;

    #[test]
    fn test_demo_plan_shape() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/dream.toml");
        let plan = load_plan(&path).unwrap();

        assert_eq!(plan.name(), "dream");
        assert_eq!(plan.groups().len(), 2);
        assert_eq!(plan.groups()[0].mode(), GroupMode::Concurrent);
        assert_eq!(plan.groups()[0].len(), 4);
        assert_eq!(plan.epilogue().len(), 1);
        assert_eq!(plan.step_count(), 6);

        let extension = plan.extension().unwrap();
        assert_eq!(extension.referenced_steps(), vec!["patent", "market"]);
        let preview = extension.preview().unwrap();
        assert_eq!(preview.step_ids().collect::<Vec<_>>(), vec!["replan", "ipstrategy"]);

        assert_eq!(plan.estimated_duration(false), Duration::from_millis(7_000));
        assert_eq!(plan.estimated_duration(true), Duration::from_millis(12_500));
    }
}

mod format_tests {
    use super::*;

    const TOML_PLAN: &str = r#"
name = "twin"
[[groups]]
mode = "sequential"
steps = [
  { id = "a", duration_ms = 100, checkpoints = 2, result = "first" },
  { id = "b", duration_ms = 200, checkpoints = [{ at = 0.25, label = "quarter" }] },
]
"#;

    const YAML_PLAN: &str = r#"
name: twin
groups:
  - mode: sequential
    steps:
      - id: a
        duration_ms: 100
        checkpoints: 2
        result: first
      - id: b
        duration_ms: 200
        checkpoints:
          - at: 0.25
            label: quarter
"#;

    #[test]
    fn test_toml_and_yaml_agree() {
        let dir = tempfile::tempdir().unwrap();
        let from_toml = load_plan(&write(dir.path(), "twin.toml", TOML_PLAN)).unwrap();
        let from_yaml = load_plan(&write(dir.path(), "twin.yaml", YAML_PLAN)).unwrap();

        assert_eq!(from_toml.name(), from_yaml.name());
        assert_eq!(from_toml.groups(), from_yaml.groups());
        assert_eq!(
            from_toml.estimated_duration(false),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_document_defaults() {
        let doc = PlanDocument::from_toml_str("name = \"empty\"").unwrap();
        assert!(doc.groups.is_empty());
        assert!(doc.extension.is_none());
        let plan = doc.into_plan().unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.step_count(), 0);
    }

    #[test]
    fn test_group_mode_defaults_to_concurrent() {
        let doc = PlanDocument::from_toml_str(
            "name = \"m\"\n[[groups]]\nsteps = [{ id = \"a\", duration_ms = 1 }]\n",
        )
        .unwrap();
        assert_eq!(doc.groups[0].mode, GroupMode::Concurrent);
    }
}

mod error_tests {
    use super::*;

    fn load_err(content: &str) -> DreamlineError {
        let dir = tempfile::tempdir().unwrap();
        load_plan(&write(dir.path(), "plan.toml", content)).unwrap_err()
    }

    #[test]
    fn test_duplicate_step_ids() {
        let err = load_err(
            r#"
name = "dup"
[[groups]]
steps = [{ id = "a", duration_ms = 10 }]
[[epilogue]]
steps = [{ id = "a", duration_ms = 10 }]
"#,
        );
        assert!(matches!(
            err,
            DreamlineError::Configuration(ConfigurationError::DuplicateStep { ref id }) if id == "a"
        ));
    }

    #[test]
    fn test_zero_duration() {
        let err = load_err(
            "name = \"z\"\n[[groups]]\nsteps = [{ id = \"a\", duration_ms = 0 }]\n",
        );
        assert!(matches!(
            err,
            DreamlineError::Configuration(ConfigurationError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn test_checkpoint_out_of_range() {
        let err = load_err(
            "name = \"r\"\n[[groups]]\nsteps = [{ id = \"a\", duration_ms = 5, checkpoints = [{ at = 1.5 }] }]\n",
        );
        assert!(matches!(
            err,
            DreamlineError::Configuration(ConfigurationError::CheckpointOutOfRange { .. })
        ));
    }

    #[test]
    fn test_extension_reuses_main_id() {
        let err = load_err(
            r#"
name = "clash"
[[groups]]
steps = [{ id = "a", duration_ms = 10 }]
[extension]
[extension.group]
steps = [{ id = "a", duration_ms = 10 }]
"#,
        );
        assert!(matches!(
            err,
            DreamlineError::Configuration(ConfigurationError::DuplicateStep { .. })
        ));
    }

    #[test]
    fn test_parse_errors_map_to_config_exit_code() {
        let err = load_err("name = ");
        assert!(matches!(err, DreamlineError::PlanParse { .. }));
        assert_eq!(get_exit_code(&anyhow::Error::from(err)), EXIT_CONFIG_ERROR);
    }
}
