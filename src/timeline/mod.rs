//! Deterministic timed-event playback
//!
//! Drives progress through a declarative timeline:
//! - Steps wait out a duration and fire checkpoint events along the way
//! - Groups run their steps concurrently (fan-out/fan-in) or sequentially
//! - Plans run groups in order, with one optional conditional extension
//!
//! # Example
//!
//! ```ignore
//! use dreamline::timeline::{PlayerConfig, RunPlan, Step, StepGroup, TimelinePlayer};
//! use std::time::Duration;
//!
//! let plan = RunPlan::new("demo").with_group(StepGroup::concurrent([
//!     Step::uniform("patent", Duration::from_millis(400), 2),
//!     Step::uniform("market", Duration::from_millis(300), 2),
//! ]));
//! let player = TimelinePlayer::new(PlayerConfig::default())?;
//! let outcome = player.execute(&plan).await?;
//! ```

mod abort;
mod events;
mod group;
mod plan;
mod player;
mod result;
mod step;

pub use abort::AbortHandle;
pub use events::{CheckpointEvent, EventReceiver, EventSender, Phase, PlayerEvent};
pub use group::{GroupMode, StepGroup};
pub use plan::{Extension, ExtensionFactory, ExtensionPredicate, FixedGroup, RunPlan};
pub use player::{PlayerConfig, TimelinePlayer};
pub use result::{Results, RunOutcome, RunResult};
pub use step::{Checkpoint, Step};
