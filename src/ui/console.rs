//! Terminal presenter for player events
//!
//! Consumes the event stream from [`TimelinePlayer::subscribe`] and prints
//! one line per interesting event. Rendering is split from printing so the
//! line format can be tested without a terminal. Text that comes from a
//! plan is escaped before it is printed.
//!
//! [`TimelinePlayer::subscribe`]: crate::timeline::TimelinePlayer::subscribe

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use super::style::{progress_bar, Glyphs, TimelineStyle};
use crate::observability::telemetry::sanitize_for_log;
use crate::timeline::{EventReceiver, Phase, PlayerEvent, RunResult};

const BAR_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    /// Prefix each line with local wall-clock time
    pub timestamps: bool,
    /// Drop step starts and checkpoint lines
    pub quiet: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            timestamps: true,
            quiet: false,
        }
    }
}

pub struct ConsoleView {
    options: ConsoleOptions,
    names: HashMap<String, String>,
}

impl ConsoleView {
    pub fn new(options: ConsoleOptions) -> Self {
        Self {
            options,
            names: HashMap::new(),
        }
    }

    /// Print events until the player drops its sender.
    pub async fn drive(mut self, mut rx: EventReceiver) {
        while let Some(event) = rx.recv().await {
            if let Some(line) = self.render(&event) {
                println!("{}", line);
            }
        }
    }

    pub fn render(&mut self, event: &PlayerEvent) -> Option<String> {
        let body = match event {
            PlayerEvent::RunStarted { plan, steps } => format!(
                "{} {} {}",
                Glyphs::play(),
                sanitize_for_log(plan).as_str().heading(),
                format!("({} steps)", steps).as_str().muted()
            ),
            PlayerEvent::GroupStarted {
                index,
                phase,
                mode,
                label,
                steps,
            } => {
                let title = match label {
                    Some(label) => sanitize_for_log(label),
                    None => sanitize_for_log(&steps.join(", ")),
                };
                format!(
                    "── {} · {} · {}",
                    group_title(*index, *phase),
                    mode,
                    title.as_str().heading()
                )
            }
            PlayerEvent::StepStarted {
                step_id,
                name,
                duration,
            } => {
                self.names.insert(step_id.clone(), sanitize_for_log(name));
                if self.options.quiet {
                    return None;
                }
                format!(
                    "  {} {} {}",
                    self.name_of(step_id).as_str().step_name(),
                    "started".muted(),
                    format!("({})", format_secs(*duration)).as_str().muted()
                )
            }
            PlayerEvent::Checkpoint(checkpoint) => {
                if self.options.quiet {
                    return None;
                }
                let mut line = format!(
                    "  {}  ▸ {} {:>3}%",
                    self.name_of(&checkpoint.step_id).as_str().step_name(),
                    progress_bar(checkpoint.fraction, BAR_WIDTH),
                    checkpoint.percent()
                );
                if let Some(label) = &checkpoint.label {
                    line.push_str("  ");
                    line.push_str(&sanitize_for_log(label));
                }
                line
            }
            PlayerEvent::StepCompleted {
                step_id,
                result,
                elapsed,
            } => format!(
                "  {} {} {} {}",
                Glyphs::done().success(),
                self.name_of(step_id).as_str().step_name(),
                render_value(result),
                format!("({})", format_secs(*elapsed)).as_str().muted()
            ),
            PlayerEvent::GroupCompleted {
                index,
                phase,
                elapsed,
            } => format!(
                "── {} done in {}",
                group_title(*index, *phase),
                format_secs(*elapsed)
            )
            .as_str()
            .muted()
            .to_string(),
            PlayerEvent::ExtensionTriggered { label, steps } => format!(
                "{} {} {}",
                Glyphs::branch().warning(),
                sanitize_for_log(label.as_deref().unwrap_or("Re-plan"))
                    .as_str()
                    .warning(),
                format!("(+ {})", sanitize_for_log(&steps.join(", ")))
                    .as_str()
                    .muted()
            ),
            PlayerEvent::RunCompleted { elapsed, extended } => format!(
                "{} Run complete in {}{}",
                Glyphs::done().success(),
                format_secs(*elapsed),
                if *extended { ", extended" } else { "" }
            ),
            PlayerEvent::RunAborted => return None,
        };

        Some(self.stamp(body))
    }

    fn name_of(&self, step_id: &str) -> String {
        match self.names.get(step_id) {
            Some(name) => name.clone(),
            None => sanitize_for_log(step_id),
        }
    }

    fn stamp(&self, body: String) -> String {
        if self.options.timestamps {
            let now = chrono::Local::now().format("%H:%M:%S").to_string();
            format!("{} {}", now.as_str().timestamp(), body)
        } else {
            body
        }
    }
}

/// Group indices run across phases, so extension and epilogue groups
/// continue the main numbering.
fn group_title(index: usize, phase: Phase) -> String {
    match phase {
        Phase::Main => format!("Group {}", index + 1),
        other => format!("Group {} ({})", index + 1, other),
    }
}

fn format_secs(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}

/// Strings print bare; everything else prints as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize_for_log(s),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Final summary for a completed run.
pub fn render_summary(result: &RunResult) -> String {
    let title = format!("Summary: {}", sanitize_for_log(&result.plan));
    let mut out = format!("\n{}\n", title.as_str().heading());
    let ids: Vec<String> = result.results.ids().map(sanitize_for_log).collect();
    let width = ids.iter().map(String::len).max().unwrap_or(0);
    for (id, value) in ids.iter().zip(result.results.iter().map(|(_, v)| v)) {
        out.push_str(&format!("  {:<width$}  {}\n", id, render_value(value), width = width));
    }
    out.push_str(&format!(
        "  {} steps · {} checkpoints · {} · {}\n",
        result.results.len(),
        result.checkpoints.len(),
        format_secs(result.elapsed),
        if result.extended {
            "extension fired"
        } else {
            "no extension"
        }
    ));
    out
}

pub fn render_stopped() -> String {
    format!("{} {}", Glyphs::stop().warning(), "Run stopped".warning())
}
