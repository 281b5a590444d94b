//! Same seed, same participant behaviour: the data files must match
//! byte for byte. Timestamps come from the manual clock, so they are
//! part of the comparison.

use aidm_core::{
    agent::{HeadlessPresenter, Policy, SimulatedParticipant},
    clock::ManualClock,
    config::TaskConfig,
    engine::TaskRunner,
    interface::Key,
    session::SessionInfo,
    types::{Condition, TaskKind},
};
use std::fs;
use std::path::Path;

fn csv_for(root: &Path, task: TaskKind, condition: Option<Condition>, seed: u64, policy: Policy) -> String {
    let mut config = TaskConfig::default();
    config.psap.task_duration = 300.0;
    let session = SessionInfo::new(task, "7", condition, false, Some(seed))
        .expect("session")
        .with_date_time("2026-01-01-12-00-00-000000");
    let runner = TaskRunner::new(session, config, root).expect("runner");
    let clock = ManualClock::new();
    let mut input = SimulatedParticipant::new(policy).with_clock(clock.clone(), 0.25);
    let mut presenter = HeadlessPresenter::new();
    runner.run(&clock, &mut presenter, &mut input).expect("run");
    fs::read_to_string(runner.csv_path()).expect("read csv")
}

fn assert_identical(a: &str, b: &str) {
    let (lines_a, lines_b): (Vec<_>, Vec<_>) = (a.lines().collect(), b.lines().collect());
    assert_eq!(
        lines_a.len(), lines_b.len(),
        "Row counts differ: {} vs {}",
        lines_a.len(), lines_b.len()
    );
    for (i, (a, b)) in lines_a.iter().zip(lines_b.iter()).enumerate() {
        assert_eq!(a, b, "Data diverged at line {i}:\n  A: {a}\n  B: {b}");
    }
}

#[test]
fn same_seed_produces_identical_card_rows() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    let (dir_a, dir_b) = (tempfile::tempdir().expect("tempdir"), tempfile::tempdir().expect("tempdir"));

    let a = csv_for(dir_a.path(), TaskKind::Crcp, None, SEED, Policy::StopAfter(8));
    let b = csv_for(dir_b.path(), TaskKind::Crcp, None, SEED, Policy::StopAfter(8));
    assert_identical(&a, &b);
}

#[test]
fn different_seeds_shuffle_decks_differently() {
    let (dir_a, dir_b) = (tempfile::tempdir().expect("tempdir"), tempfile::tempdir().expect("tempdir"));

    let a = csv_for(dir_a.path(), TaskKind::Crcp, None, 1, Policy::StopAfter(8));
    let b = csv_for(dir_b.path(), TaskKind::Crcp, None, 2, Policy::StopAfter(8));
    assert_ne!(a, b, "Seeds 1 and 2 should not produce the same session");
}

#[test]
fn same_seed_produces_identical_balloon_rows() {
    const SEED: u64 = 99;
    let (dir_a, dir_b) = (tempfile::tempdir().expect("tempdir"), tempfile::tempdir().expect("tempdir"));

    let a = csv_for(dir_a.path(), TaskKind::Bart, None, SEED, Policy::StopAfter(5));
    let b = csv_for(dir_b.path(), TaskKind::Bart, None, SEED, Policy::StopAfter(5));
    assert_identical(&a, &b);
}

#[test]
fn same_seed_produces_identical_point_subtraction_rows() {
    const SEED: u64 = 5150;
    let (dir_a, dir_b) = (tempfile::tempdir().expect("tempdir"), tempfile::tempdir().expect("tempdir"));
    let cycle = || Policy::Cycle(vec![Key::Char('s'), Key::Char('h'), Key::Char('l')]);

    let a = csv_for(dir_a.path(), TaskKind::Psap, Some(Condition::A), SEED, cycle());
    let b = csv_for(dir_b.path(), TaskKind::Psap, Some(Condition::A), SEED, cycle());
    assert_identical(&a, &b);
}
