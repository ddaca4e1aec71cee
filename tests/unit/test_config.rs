//! Unit tests for the config module
//!
//! Tests cover:
//! - Config defaults
//! - TOML deserialization of every section
//! - Environment overrides
//! - Conversion to player settings

use dreamline::config::{Config, LoggingSettings, PlayerSettings, UiSettings};
use dreamline::errors::DreamlineError;
use dreamline::timeline::{PlayerConfig, TimelinePlayer};

mod default_tests {
    use super::*;

    #[test]
    fn test_section_defaults() {
        assert_eq!(PlayerSettings::default().speed, 1.0);
        assert_eq!(LoggingSettings::default().filter, None);
        let ui = UiSettings::default();
        assert!(ui.color && ui.timestamps && !ui.quiet);
    }

    #[test]
    fn test_default_player_config_is_usable() {
        let config = Config::default();
        assert!(TimelinePlayer::new(config.player_config()).is_ok());
    }
}

mod load_tests {
    use super::*;

    #[test]
    fn test_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dreamline.toml");
        std::fs::write(
            &path,
            r#"
[player]
speed = 0.75

[logging]
filter = "dreamline=trace"

[ui]
color = false
timestamps = false
quiet = true
"#,
        )
        .unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.player_config(), PlayerConfig::presentation());
        assert_eq!(config.logging.filter.as_deref(), Some("dreamline=trace"));
        assert!(!config.ui.timestamps);
        assert!(config.ui.quiet);
    }

    #[test]
    fn test_invalid_speed_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.toml");
        std::fs::write(&path, "[player]\nspeed = -1.0\n").unwrap();
        assert!(matches!(
            Config::load(path.to_str()),
            Err(DreamlineError::Configuration(_))
        ));
    }

    #[test]
    fn test_env_override_beats_file() {
        let mut config = Config::from_toml_str("[player]\nspeed = 2.0\n").unwrap();
        config.apply_env_from(|k| match k {
            "DREAMLINE_SPEED" => Some("8".to_string()),
            _ => None,
        });
        assert_eq!(config.player.speed, 8.0);
        assert!(config.ui.color);
    }

    #[test]
    fn test_blank_log_override_is_ignored() {
        let mut config = Config::from_toml_str("[logging]\nfilter = \"warn\"\n").unwrap();
        config.apply_env_from(|k| (k == "DREAMLINE_LOG").then(|| "  ".to_string()));
        assert_eq!(config.logging.filter.as_deref(), Some("warn"));
    }
}
