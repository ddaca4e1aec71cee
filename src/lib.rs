//! Dreamline - deterministic timeline playback
//!
//! Plays a scripted multi-agent run on a clock: steps wait out their
//! durations and fire progress checkpoints, groups fan out or run in
//! sequence, and one conditional extension group can be spliced in after
//! the main groups have finished.
//!
//! - **Timeline**: player, plan model, checkpoint events, abort handle
//! - **Plan files**: TOML / YAML documents with declarative extension rules
//! - **Console**: terminal presenter for the event stream
//!
//! # Quick Start
//!
//! ```ignore
//! use dreamline::{load_plan, PlayerConfig, TimelinePlayer};
//!
//! let plan = load_plan("demos/dream.toml".as_ref())?;
//! let player = TimelinePlayer::new(PlayerConfig::default())?;
//! let outcome = player.execute(&plan).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tokio::sync::Notify;

// ─── Core ──────────────────────────────────────────────────────────
pub mod errors;
pub mod plan_file;
pub mod timeline;

// ─── Runtime surface ───────────────────────────────────────────────
pub mod cli;
pub mod config;
pub mod observability;
pub mod ui;

pub use errors::{ConfigurationError, DreamlineError};
pub use plan_file::load_plan;
pub use timeline::{
    AbortHandle, PlayerConfig, PlayerEvent, RunOutcome, RunPlan, RunResult, Step, StepGroup,
    TimelinePlayer,
};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

fn shutdown_notify() -> &'static Notify {
    static NOTIFY: OnceLock<Notify> = OnceLock::new();
    NOTIFY.get_or_init(Notify::new)
}

/// Flag the process for shutdown and wake anyone waiting on it.
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    shutdown_notify().notify_waiters();
}

pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Resolves once [`request_shutdown`] has been called.
pub async fn shutdown_requested() {
    loop {
        let notified = shutdown_notify().notified();
        if is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}
