//! Playback of the bundled demo plan and other end-to-end player scenarios

use std::time::Duration;

use dreamline::plan_file::PlanDocument;
use dreamline::timeline::{
    EventReceiver, Phase, PlayerConfig, PlayerEvent, RunOutcome, RunPlan, Step, StepGroup,
    TimelinePlayer,
};
use dreamline::load_plan;
use serde_json::json;

fn demo_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/dream.toml")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn drain(rx: &mut EventReceiver) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Demo plan
// ============================================================================

mod demo_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_demo_runs_with_replan() {
        let plan = load_plan(&demo_path()).unwrap();
        let player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let result = player.execute(&plan).await.unwrap().into_result().unwrap();

        assert!(result.extended);
        let ids: Vec<&str> = result.results.ids().collect();
        assert_eq!(
            ids,
            vec![
                "patent",
                "market",
                "trials",
                "knowledge",
                "synthesis",
                "replan",
                "ipstrategy",
                "report"
            ]
        );
        // 4000 + 1500 + (2500 + 3000) + 1500
        assert!(result.elapsed >= ms(12_500));
        assert!(result.elapsed < ms(12_600));
        assert_eq!(result.checkpoints.len(), 4 * 6 + 2 + 1 + 6 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_labels_reach_checkpoint_events() {
        let plan = load_plan(&demo_path()).unwrap();
        let player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let result = player.execute(&plan).await.unwrap().into_result().unwrap();

        let alert = result.checkpoints_for("patent").nth(4).unwrap();
        assert_eq!(
            alert.label.as_deref(),
            Some("DATA ACQUIRED: CRITICAL FTO ALERT!")
        );
        let report: Vec<_> = result.checkpoints_for("report").collect();
        assert_eq!(report.len(), 3);
        assert_eq!(report[2].label.as_deref(), Some("Final Report Ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_without_conflict_skips_replan() {
        let mut doc = PlanDocument::load(&demo_path()).unwrap();
        doc.groups[0].steps[0].result = json!("LOW RISK (Patent expired 2019)");
        let plan = doc.into_plan().unwrap();

        let player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let result = player.execute(&plan).await.unwrap().into_result().unwrap();

        assert!(!result.extended);
        assert!(!result.results.contains("ipstrategy"));
        assert!(result.results.contains("report"));
        assert!(result.elapsed >= ms(7_000));
        assert!(result.elapsed < ms(7_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_event_order_around_extension() {
        let plan = load_plan(&demo_path()).unwrap();
        let mut player = TimelinePlayer::new(PlayerConfig::fast()).unwrap();
        let mut rx = player.subscribe();
        player.execute(&plan).await.unwrap();
        let events = drain(&mut rx);

        let position = |pred: &dyn Fn(&PlayerEvent) -> bool| events.iter().position(pred).unwrap();
        let synthesis_done = position(&|e| {
            matches!(e, PlayerEvent::GroupCompleted { index: 1, phase: Phase::Main, .. })
        });
        let triggered = position(&|e| matches!(e, PlayerEvent::ExtensionTriggered { .. }));
        let extension_started = position(&|e| {
            matches!(e, PlayerEvent::GroupStarted { phase: Phase::Extension, .. })
        });
        let epilogue_started = position(&|e| {
            matches!(e, PlayerEvent::GroupStarted { phase: Phase::Epilogue, .. })
        });

        assert!(synthesis_done < triggered);
        assert!(triggered < extension_started);
        assert!(extension_started < epilogue_started);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, PlayerEvent::ExtensionTriggered { .. }))
                .count(),
            1
        );
        assert!(matches!(
            events.last(),
            Some(PlayerEvent::RunCompleted { extended: true, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_abort_during_research() {
        let plan = load_plan(&demo_path()).unwrap();
        let mut player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let mut rx = player.subscribe();
        let handle = player.abort_handle();

        let trigger = async {
            tokio::time::sleep(ms(2_000)).await;
            handle.abort();
        };
        let (outcome, _) = tokio::join!(player.execute(&plan), trigger);
        assert_eq!(outcome.unwrap(), RunOutcome::Aborted);

        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(
            e,
            PlayerEvent::StepStarted { step_id, .. } if step_id == "synthesis"
        )));
        assert_eq!(events.last(), Some(&PlayerEvent::RunAborted));
    }
}

// ============================================================================
// Scenarios built in code
// ============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_two_concurrent_steps_no_extension() {
        let plan = RunPlan::new("pair").with_group(StepGroup::concurrent([
            Step::uniform("a", ms(400), 2).with_result("A"),
            Step::uniform("b", ms(300), 2).with_result("B"),
        ]));
        let player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let result = player.execute(&plan).await.unwrap().into_result().unwrap();

        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results.get("a"), Some(&json!("A")));
        assert!(result.elapsed >= ms(400));
        assert_eq!(result.checkpoints.len(), 4);
        assert!(!result.extended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_is_reusable() {
        let plan = RunPlan::new("again")
            .with_group(StepGroup::sequential([Step::uniform("a", ms(100), 1)]));
        let player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let first = player.execute(&plan).await.unwrap().into_result().unwrap();
        let second = player.execute(&plan).await.unwrap().into_result().unwrap();
        assert_eq!(first.results, second.results);
        assert_eq!(first.checkpoints.len(), second.checkpoints.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_serializes_as_json() {
        let plan = RunPlan::new("json")
            .with_group(StepGroup::sequential([Step::uniform("a", ms(200), 2).with_result(7)]));
        let player = TimelinePlayer::new(PlayerConfig::default()).unwrap();
        let result = player.execute(&plan).await.unwrap().into_result().unwrap();

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["plan"], json!("json"));
        assert_eq!(value["results"]["a"], json!(7));
        assert_eq!(value["elapsed_ms"], json!(200));
        assert_eq!(value["checkpoints"][0]["at_ms"], json!(100));
        assert_eq!(value["extended"], json!(false));
    }
}
