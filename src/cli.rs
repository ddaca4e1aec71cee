//! Dreamline command line
//!
//! `play` runs a plan against the clock, `validate` checks it without
//! starting any timers, `show` prints when every checkpoint is due.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::observability::telemetry::{init_tracing, sanitize_for_log};
use crate::plan_file::load_plan;
use crate::timeline::{RunOutcome, RunPlan, StepGroup, TimelinePlayer};
use crate::ui::console::{render_stopped, render_summary, ConsoleOptions, ConsoleView};
use crate::ui::style::{Glyphs, TimelineStyle};

#[derive(Parser, Debug)]
#[command(name = "dreamline")]
#[command(about = "Play scripted multi-agent timelines with deterministic timing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Log player spans and step completions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a plan in real time
    #[command(alias = "p")]
    Play {
        /// Plan file (TOML, or YAML with a .yaml/.yml extension)
        plan: PathBuf,

        /// Playback speed multiplier (2.0 = twice as fast)
        #[arg(short, long)]
        speed: Option<f64>,

        /// Print the run result as JSON instead of the live view
        #[arg(long)]
        json: bool,

        /// Only print group, completion and summary lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check a plan without playing it
    #[command(alias = "v")]
    Validate { plan: PathBuf },

    /// Print the checkpoint schedule of a plan
    Show { plan: PathBuf },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    init_tracing(config.logging.filter.as_deref(), cli.verbose);

    if cli.no_color || std::env::var("NO_COLOR").is_ok() || !config.ui.color {
        colored::control::set_override(false);
    }
    for warning in config.warnings.drain(..) {
        tracing::warn!("{}", warning);
        eprintln!("{} {}", "warning:".warning(), warning);
    }

    match cli.command {
        Commands::Play {
            plan,
            speed,
            json,
            quiet,
        } => {
            if let Some(speed) = speed {
                config.player.speed = speed;
                config.validate()?;
            }
            if quiet {
                config.ui.quiet = true;
            }
            play(&plan, &config, json).await
        }
        Commands::Validate { plan } => validate(&plan),
        Commands::Show { plan } => show(&plan),
    }
}

async fn play(path: &Path, config: &Config, json: bool) -> Result<()> {
    let plan = load_plan(path)?;
    let mut player = TimelinePlayer::new(config.player_config())?;

    let view = if json {
        None
    } else {
        let console = ConsoleView::new(ConsoleOptions {
            timestamps: config.ui.timestamps,
            quiet: config.ui.quiet,
        });
        Some(tokio::spawn(console.drive(player.subscribe())))
    };

    let handle = player.abort_handle();
    let watcher = tokio::spawn(async move {
        crate::shutdown_requested().await;
        handle.abort();
    });

    let outcome = player.execute(&plan).await;
    watcher.abort();
    // Closes the event channel so the view drains and exits.
    drop(player);
    if let Some(view) = view {
        view.await.context("Console view task failed")?;
    }

    match outcome? {
        RunOutcome::Completed(result) => {
            if json {
                let out = serde_json::to_string_pretty(&result)
                    .context("Failed to serialize run result")?;
                println!("{}", out);
            } else {
                print!("{}", render_summary(&result));
            }
        }
        RunOutcome::Aborted => eprintln!("{}", render_stopped()),
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let plan = load_plan(path)?;
    let checkpoints: usize = plan.steps().map(|s| s.checkpoints().len()).sum();

    println!(
        "{} {} is valid",
        Glyphs::done().success(),
        sanitize_for_log(plan.name()).as_str().heading()
    );
    if let Some(description) = plan.description() {
        println!("  {}", sanitize_for_log(description).as_str().muted());
    }
    println!(
        "  groups:      {} main, {} epilogue",
        plan.groups().len(),
        plan.epilogue().len()
    );
    println!("  steps:       {}", plan.step_count());
    println!("  checkpoints: {}", checkpoints);
    println!(
        "  duration:    {} ({} with extension)",
        secs(plan.estimated_duration(false)),
        secs(plan.estimated_duration(true))
    );
    match plan.extension() {
        Some(extension) => println!(
            "  extension:   {}",
            sanitize_for_log(extension.label().unwrap_or("conditional group"))
        ),
        None => println!("  extension:   none"),
    }
    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let plan = load_plan(path)?;
    print!("{}", render_schedule(&plan));
    Ok(())
}

/// Planned checkpoint times, assuming the extension fires.
fn render_schedule(plan: &RunPlan) -> String {
    let mut out = String::new();
    let mut origin = Duration::ZERO;

    let mut sections: Vec<(String, &StepGroup)> = plan
        .groups()
        .iter()
        .enumerate()
        .map(|(i, g)| (format!("Group {}", i + 1), g))
        .collect();
    if let Some(group) = plan.extension().and_then(|e| e.preview()) {
        sections.push(("Extension (if triggered)".to_string(), group));
    }
    sections.extend(
        plan.epilogue()
            .iter()
            .enumerate()
            .map(|(i, g)| (format!("Epilogue {}", i + 1), g)),
    );

    for (title, group) in sections {
        out.push_str(&format!("{} · {}", title.as_str().heading(), group.mode()));
        if let Some(label) = group.label() {
            out.push_str(&format!(" · {}", sanitize_for_log(label)));
        }
        out.push('\n');

        let mut step_origin = origin;
        for step in group.steps() {
            out.push_str(&format!(
                "  {:>8}  {} {}\n",
                format!("+{}", secs(step_origin)),
                sanitize_for_log(step.name()).as_str().step_name(),
                format!("({})", secs(step.duration())).as_str().muted()
            ));
            for (i, checkpoint) in step.checkpoints().iter().enumerate() {
                let offset = step.offset_of(i).unwrap_or_default();
                let mut line = format!(
                    "  {:>8}    {:>3}%",
                    format!("+{}", secs(step_origin + offset)),
                    (checkpoint.fraction * 100.0).round() as u32
                );
                if let Some(label) = &checkpoint.label {
                    line.push_str("  ");
                    line.push_str(&sanitize_for_log(label));
                }
                out.push_str(&line);
                out.push('\n');
            }
            if group.mode() == crate::timeline::GroupMode::Sequential {
                step_origin += step.duration();
            }
        }
        origin += group.planned_duration();
    }
    out
}

fn secs(d: Duration) -> String {
    format!("{:.2}s", d.as_secs_f64())
}
