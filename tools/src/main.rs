//! task-runner: runs one CRCP, BART or PSAP session.
//!
//! Usage:
//!   task-runner --task crcp --participant 12
//!   task-runner --task psap --participant 12 --condition A --practice
//!   task-runner --task bart --agent stop-after:6 --seed 7 --json

mod terminal;

use aidm_core::{
    agent::{HeadlessPresenter, Policy, SimulatedParticipant},
    clock::{ManualClock, MonotonicClock},
    config::TaskConfig,
    engine::TaskRunner,
    interface::Presenter,
    session::SessionInfo,
    task::RunOutcome,
    types::{Condition, TaskKind},
};
use anyhow::{anyhow, Result};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use terminal::{TerminalInput, TerminalPresenter};

/// Simulated response latency in headless runs.
const AGENT_LATENCY: f64 = 0.4;

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let task: TaskKind = flag(&args, "--task").unwrap_or("crcp").parse()?;
    let condition = flag(&args, "--condition").map(str::parse::<Condition>).transpose()?;
    let practice = args.iter().any(|a| a == "--practice");
    let json = args.iter().any(|a| a == "--json");
    let show = args.iter().any(|a| a == "--show");
    let seed = parse_seed(flag(&args, "--seed"))?;
    let data_root = flag(&args, "--data-root").unwrap_or("./data");
    let agent = flag(&args, "--agent").map(str::parse::<Policy>).transpose()?;

    let config = match flag(&args, "--config") {
        Some(path) => TaskConfig::load(Path::new(path))?,
        None => TaskConfig::default(),
    };

    let participant = match flag(&args, "--participant") {
        Some(id) => id.to_string(),
        None if agent.is_some() => String::new(),
        None => ask_participant()?,
    };

    let session = match SessionInfo::new(task, &participant, condition, practice, seed) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let runner = TaskRunner::new(session, config, data_root)?;

    if !json {
        let session = runner.session();
        println!("{} - task-runner", session.experiment_name);
        println!("  participant: {}", session.participant_id);
        if let Some(condition) = session.condition {
            println!("  condition:   {condition}");
        }
        println!("  practice:    {}", session.practice);
        println!("  seed:        {}", session.seed);
        println!("  data:        {}", runner.csv_path().display());
        println!();
    }

    let outcome = match agent {
        Some(policy) => {
            let clock = ManualClock::new();
            let mut input = SimulatedParticipant::new(policy).with_clock(clock.clone(), AGENT_LATENCY);
            let mut headless = HeadlessPresenter::new();
            let mut terminal = TerminalPresenter::new();
            let presenter: &mut dyn Presenter = if show { &mut terminal } else { &mut headless };
            runner.run(&clock, presenter, &mut input)?
        }
        None => {
            let clock = MonotonicClock::new();
            let mut input = TerminalInput::spawn();
            let mut presenter = TerminalPresenter::new();
            runner.run(&clock, &mut presenter, &mut input)?
        }
    };

    if json {
        match outcome.summary() {
            Some(summary) => println!("{}", serde_json::to_string_pretty(summary)?),
            None => println!("{}", serde_json::json!({ "aborted": true, "rows_written": outcome.rows_written() })),
        }
    } else {
        print_summary(&runner, &outcome);
    }
    Ok(ExitCode::SUCCESS)
}

fn ask_participant() -> Result<String> {
    print!("Participant number (empty = 9999): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| anyhow!("Cannot read participant number: {e}"))?;
    Ok(line.trim().to_string())
}

fn print_summary(runner: &TaskRunner, outcome: &RunOutcome) {
    println!();
    match outcome {
        RunOutcome::Completed(summary) => {
            println!("=== RUN SUMMARY ===");
            println!("  task:       {}", summary.task);
            println!("  trials:     {}", summary.trials);
            println!("  rows:       {}", summary.rows_written);
            println!("  total:      {:.2}", summary.total);
            match summary.task {
                TaskKind::Psap => println!("  incidents:  {}", summary.incidents),
                _ => {
                    println!("  failures:   {}", summary.failures);
                    println!("  timeouts:   {}", summary.timeouts);
                }
            }
        }
        RunOutcome::Aborted { trials_started, rows_written } => {
            println!("=== ABORTED ===");
            println!("  trials started: {trials_started}");
            println!("  rows kept:      {rows_written}");
        }
    }
    println!("  csv:        {}", runner.csv_path().display());
    println!("  manifest:   {}", runner.manifest_path().display());
}

/// A malformed seed is an error, never a silent switch to a random one.
fn parse_seed(value: Option<&str>) -> Result<Option<u64>> {
    value
        .map(|s| s.parse::<u64>().map_err(|e| anyhow!("Invalid --seed '{s}': {e}")))
        .transpose()
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == name).map(|w| w[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seed_flag_is_parsed_or_rejected() {
        assert_eq!(parse_seed(None).unwrap(), None);
        assert_eq!(parse_seed(Some("7")).unwrap(), Some(7));
        let err = parse_seed(Some("7x")).unwrap_err();
        assert!(err.to_string().contains("--seed"), "unexpected error: {err}");

        let argv = args(&["task-runner", "--seed", "-3"]);
        assert!(parse_seed(flag(&argv, "--seed")).is_err());
    }
}
