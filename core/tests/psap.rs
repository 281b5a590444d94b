//! Point-subtraction task: incident schedules per condition.

use aidm_core::{
    agent::{HeadlessPresenter, Policy, SimulatedParticipant},
    clock::ManualClock,
    config::TaskConfig,
    engine::TaskRunner,
    interface::{Key, Screen},
    psap_task::{ActionLayout, IncidentKind, PsapAction},
    rng::{RngBank, StreamSlot},
    session::SessionInfo,
    task::RunOutcome,
    types::{Condition, TaskKind},
};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

const SEED: u64 = 2024;

fn config() -> TaskConfig {
    let mut config = TaskConfig::default();
    config.psap.task_duration = 600.0;
    config
}

/// The key bound to `action` for a session seeded with SEED.
fn key_for(config: &TaskConfig, action: PsapAction) -> Key {
    let mut rng = RngBank::new(SEED).for_stream(StreamSlot::StimulusLayout);
    ActionLayout::shuffled(&mut rng, &config.psap.button_colors).key_for(action)
}

fn run_psap(
    root: &Path,
    config: TaskConfig,
    condition: Condition,
    practice: bool,
    policy: Policy,
) -> (TaskRunner, RunOutcome, HeadlessPresenter) {
    let session = SessionInfo::new(TaskKind::Psap, "20", Some(condition), practice, Some(SEED))
        .expect("session")
        .with_date_time("2026-01-01-11-00-00-000000");
    let runner = TaskRunner::new(session, config, root).expect("runner");
    let clock = ManualClock::new();
    let mut input = SimulatedParticipant::new(policy).with_clock(clock.clone(), 0.2);
    let mut presenter = HeadlessPresenter::new();
    let outcome = runner.run(&clock, &mut presenter, &mut input).expect("run");
    (runner, outcome, presenter)
}

fn incident_kinds(presenter: &HeadlessPresenter) -> Vec<IncidentKind> {
    presenter
        .screens()
        .iter()
        .filter_map(|s| match s {
            Screen::Incident { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn neutral_condition_has_no_incidents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config();
    let earn = key_for(&config, PsapAction::Earn);
    let (runner, outcome, presenter) = run_psap(dir.path(), config, Condition::C, false, Policy::Cycle(vec![earn]));
    let summary = outcome.summary().expect("summary");

    assert_eq!(summary.incidents, 0);
    assert!(incident_kinds(&presenter).is_empty());
    assert_eq!(summary.total, summary.trials as f64, "Every Earn adds one point");

    let content = fs::read_to_string(runner.csv_path()).expect("read csv");
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("id,condition,color_01,color_02,color_03,action_01,action_02,action_03,choice,n_incidents,t_last_incident,start,end")
    );
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields[0], "20");
        assert_eq!(fields[1], "C");
        assert_eq!(fields[8], earn.label());
        assert_eq!(fields[9], "0");
    }
}

#[test]
fn steals_take_one_point_each() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config();
    let earn = key_for(&config, PsapAction::Earn);
    let (_, outcome, presenter) = run_psap(dir.path(), config, Condition::A, false, Policy::Cycle(vec![earn]));
    let summary = outcome.summary().expect("summary");

    let kinds = incident_kinds(&presenter);
    assert!(!kinds.is_empty(), "Steals fire every 6 to 60 s");
    assert!(kinds.iter().all(|k| *k == IncidentKind::Steal));
    assert_eq!(kinds.len() as u32, summary.incidents);
    assert_eq!(summary.total, summary.trials as f64 - summary.incidents as f64);
}

#[test]
fn glitches_halve_the_score() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config();
    config.psap.task_duration = 1500.0;
    let earn = key_for(&config, PsapAction::Earn);
    let (_, outcome, presenter) = run_psap(dir.path(), config, Condition::B, false, Policy::Cycle(vec![earn]));
    let summary = outcome.summary().expect("summary");

    assert!(summary.incidents >= 2, "A 1500 s session holds at least two glitches");
    for screen in presenter.screens() {
        if let Screen::Incident { kind, lost, score, .. } = screen {
            assert_eq!(*kind, IncidentKind::Glitch);
            assert!((lost - score).abs() < 1e-9, "A glitch leaves exactly what it took");
        }
    }
    assert!(summary.total < summary.trials as f64);
}

#[test]
fn practice_alternates_glitch_and_steal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TaskConfig::default();
    let earn = key_for(&config, PsapAction::Earn);
    let (runner, outcome, presenter) = run_psap(dir.path(), config, Condition::C, true, Policy::Cycle(vec![earn]));

    let kinds = incident_kinds(&presenter);
    assert!(kinds.len() >= 3, "Practice fires every 20 s over 90 s, got {}", kinds.len());
    for (i, kind) in kinds.iter().enumerate() {
        let expected = if i % 2 == 0 { IncidentKind::Glitch } else { IncidentKind::Steal };
        assert_eq!(*kind, expected, "incident #{}", i + 1);
    }

    assert!(runner.csv_path().starts_with(dir.path().join("tests")));
    assert_eq!(presenter.count(|s| matches!(s, Screen::Lobby { .. })), 0, "No lobby in practice");
    assert!(presenter.screens().iter().any(|s| matches!(s, Screen::Incident { opponent, .. } if opponent == "PRACTICE")));
    assert!(outcome.summary().is_some());
}

#[test]
fn protecting_every_round_prevents_incidents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TaskConfig::default();
    let protect = key_for(&config, PsapAction::Protect);
    let (_, outcome, presenter) = run_psap(dir.path(), config, Condition::C, true, Policy::Cycle(vec![protect]));

    // Protect resets the incident timer every round, so it never runs out.
    assert!(incident_kinds(&presenter).is_empty());
    assert_eq!(outcome.summary().map(|s| s.total), Some(0.0));
}

#[test]
fn opponent_is_participant_plus_two() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config();
    let earn = key_for(&config, PsapAction::Earn);
    let (_, _, presenter) = run_psap(dir.path(), config, Condition::A, false, Policy::Cycle(vec![earn]));

    let lobby = presenter.screens().iter().find_map(|s| match s {
        Screen::Lobby { player, opponent } => Some((player.clone(), opponent.clone())),
        _ => None,
    });
    assert_eq!(lobby, Some(("20".to_string(), "22".to_string())));
}

#[test]
fn quit_on_choice_aborts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TaskConfig::default();
    let earn = key_for(&config, PsapAction::Earn);
    let script = VecDeque::from([Some(earn), Some(earn), Some(Key::Escape)]);
    let (runner, outcome, _) = run_psap(dir.path(), config, Condition::A, true, Policy::Scripted(script));

    assert!(matches!(outcome, RunOutcome::Aborted { rows_written: 2, .. }));
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(runner.manifest_path()).expect("manifest"))
            .expect("manifest json");
    assert!(manifest["summary"].is_null());
    assert_eq!(manifest["session"]["condition"], "A");
}

#[test]
fn largest_participant_id_runs_to_completion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = TaskConfig::default();
    config.psap.task_duration = 30.0;
    let earn = key_for(&config, PsapAction::Earn);
    let session = SessionInfo::new(TaskKind::Psap, &u64::MAX.to_string(), Some(Condition::A), false, Some(SEED))
        .expect("session")
        .with_date_time("2026-01-01-11-30-00-000000");
    let runner = TaskRunner::new(session, config, dir.path()).expect("runner");
    let clock = ManualClock::new();
    let mut input = SimulatedParticipant::new(Policy::Cycle(vec![earn])).with_clock(clock.clone(), 0.2);
    let mut presenter = HeadlessPresenter::new();
    let outcome = runner.run(&clock, &mut presenter, &mut input).expect("run");

    assert!(outcome.summary().is_some());
    let opponent = presenter.screens().iter().find_map(|s| match s {
        Screen::Lobby { opponent, .. } => Some(opponent.clone()),
        _ => None,
    });
    assert_eq!(opponent, Some(u64::MAX.to_string()), "Opponent label saturates instead of wrapping");
}
