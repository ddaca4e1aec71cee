use std::path::PathBuf;
use thiserror::Error;

/// Structural problems with a plan, detected before any timer starts.
///
/// The player never retries or swallows these: a malformed plan is refused
/// outright rather than partially played.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Unknown step '{id}'")]
    UnknownStep { id: String },

    #[error("Duplicate step id '{id}'")]
    DuplicateStep { id: String },

    #[error("Step '{step}': checkpoint {index} at {fraction} does not come after {previous}")]
    NonIncreasingCheckpoints {
        step: String,
        index: usize,
        previous: f64,
        fraction: f64,
    },

    #[error("Step '{step}': checkpoint {index} at {fraction} is outside [0, 1]")]
    CheckpointOutOfRange {
        step: String,
        index: usize,
        fraction: f64,
    },

    #[error("Step '{step}' must have a positive duration")]
    NonPositiveDuration { step: String },

    #[error("Playback speed must be a finite number of at least 0.001, got {speed}")]
    InvalidSpeed { speed: f64 },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

/// The central error type for the dreamline binary and plan loading.
#[derive(Error, Debug)]
pub enum DreamlineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to read plan {path}: {source}")]
    PlanRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plan {path}: {message}")]
    PlanParse { path: PathBuf, message: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DreamlineError>;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Determine the appropriate process exit code for an error.
pub fn get_exit_code(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<DreamlineError>() {
        return match err {
            DreamlineError::Configuration(_)
            | DreamlineError::PlanRead { .. }
            | DreamlineError::PlanParse { .. }
            | DreamlineError::Settings(_) => EXIT_CONFIG_ERROR,
            DreamlineError::Other(_) => EXIT_ERROR,
        };
    }

    // Direct enum fallback
    if e.downcast_ref::<ConfigurationError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }

    EXIT_ERROR
}
