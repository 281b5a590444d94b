//! Balloon Analogue Risk Task, card-shape variant.
//!
//! Each pump adds a fixed reward to the pot and may pop the balloon,
//! with odds of 1 / pumps remaining. Collecting banks the pot; a pop or
//! a missed response window loses it.
//!
//! The trial list is one balloon per shape, pump limits assigned to
//! shapes round-robin, repeated and shuffled with a fixed order seed so
//! every participant plays the same sequence.

use crate::{
    config::BartConfig,
    error::TaskResult,
    interface::{InputRequest, Key, Screen},
    rng::{RngBank, StreamSlot},
    store::{fmt_points, fmt_time, CsvRecord},
    task::{ExperimentTask, RunOutcome, RunSummary, TaskContext},
    trial::{Bank, Resolution, RiskTrial, TrialInput},
    types::{ParticipantId, Seconds, TaskKind},
};

const KEYS: [Key; 3] = [Key::Space, Key::Enter, Key::Escape];

/// Shapes shown on the pump prompt are drawn from the first few only.
const PROMPT_SHAPES: usize = 3;

/// One balloon in the trial list.
#[derive(Debug, Clone, PartialEq)]
pub struct BalloonDef {
    pub shape:     String,
    pub max_pumps: u32,
    pub reward:    f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BartRecord {
    pub participant_id: ParticipantId,
    pub trial_id:       u32,
    pub max_pumps:      u32,
    pub shape:          String,
    pub reward:         f64,
    pub pot:            f64,
    pub pumps:          u32,
    pub resolution:     Resolution,
    pub total:          f64,
    pub start:          Seconds,
    pub end:            Seconds,
}

impl CsvRecord for BartRecord {
    fn header() -> &'static [&'static str] {
        &["id", "trial_id", "max_pumps", "shape", "reward", "pot", "pumps", "choice", "popped", "total", "start", "end"]
    }

    fn fields(&self) -> Vec<String> {
        let (choice, popped) = match self.resolution {
            Resolution::Continued => ("1", "False"),
            Resolution::Failed => ("1", "True"),
            Resolution::CashedOut => ("0", "False"),
            Resolution::TimedOut => ("99", "99"),
        };
        vec![
            self.participant_id.to_string(),
            self.trial_id.to_string(),
            self.max_pumps.to_string(),
            self.shape.clone(),
            fmt_points(self.reward),
            fmt_points(self.pot),
            self.pumps.to_string(),
            choice.to_string(),
            popped.to_string(),
            fmt_points(self.total),
            fmt_time(self.start),
            fmt_time(self.end),
        ]
    }
}

/// Shape labels `a`, `b`, ... for `count` shapes.
pub fn shape_labels(count: u32) -> Vec<String> {
    (0..count.min(26))
        .map(|i| ((b'a' + i as u8) as char).to_string())
        .collect()
}

pub struct BartTask {
    config:   BartConfig,
    practice: bool,
}

impl BartTask {
    pub fn new(config: BartConfig, practice: bool) -> Self {
        Self { config, practice }
    }

    pub fn repetitions(&self) -> u32 {
        if self.practice {
            self.config.practice_repetitions
        } else {
            self.config.repetitions
        }
    }

    /// The full, shuffled trial list. Independent of the session seed.
    pub fn trial_list(&self) -> Vec<BalloonDef> {
        let defs: Vec<BalloonDef> = shape_labels(self.config.shape_count)
            .into_iter()
            .enumerate()
            .map(|(i, shape)| BalloonDef {
                shape,
                max_pumps: self.config.max_pumps[i % self.config.max_pumps.len()],
                reward: self.config.reward,
            })
            .collect();

        let mut trials: Vec<BalloonDef> = (0..self.repetitions())
            .flat_map(|_| defs.iter().cloned())
            .collect();
        RngBank::new(self.config.order_seed)
            .for_stream(StreamSlot::TrialOrder)
            .shuffle(&mut trials);
        trials
    }
}

impl ExperimentTask for BartTask {
    fn kind(&self) -> TaskKind { TaskKind::Bart }

    fn header(&self) -> &'static [&'static str] { BartRecord::header() }

    fn run(&mut self, ctx: &mut TaskContext<'_>) -> TaskResult<RunOutcome> {
        let trials = self.trial_list();
        let shapes = shape_labels(self.config.shape_count);
        let prompt_shapes = shapes.len().min(PROMPT_SHAPES);
        let mut display_rng = ctx.rng_bank.for_stream(StreamSlot::Display);
        let mut risk_rng = ctx.rng_bank.for_stream(StreamSlot::RiskCheck);
        let window = self.config.response_window;

        log::info!(
            "bart: participant={} balloons={} practice={}",
            ctx.session.participant_id,
            trials.len(),
            self.practice
        );

        let mut bank = Bank::new();
        let mut last_collected = 0.0;
        let mut rows: u64 = 0;

        for (trial_number, def) in trials.iter().enumerate() {
            let mut trial = RiskTrial::new(trial_number as u32, def.max_pumps);

            while !trial.is_finished() {
                let shape = shapes[display_rng.below(prompt_shapes)].clone();
                ctx.presenter.render(&Screen::BalloonPrompt {
                    shape,
                    last_collected,
                    total: bank.total(),
                })?;
                trial.begin_wait()?;
                let start = ctx.clock.now();
                let key = ctx
                    .input
                    .await_input(&InputRequest::new(&KEYS, Some(window), trial.steps()))?;

                let input = match key {
                    None => None,
                    Some(Key::Escape) => return Ok(ctx.aborted(trial_number as u32 + 1)),
                    Some(Key::Enter) => Some(TrialInput::CashOut),
                    Some(_) => Some(TrialInput::Continue),
                };
                let end = if input.is_some() { ctx.clock.now() } else { 0.0 };
                let outcome = trial.resolve(input, def.reward, &mut risk_rng)?;

                if outcome.resolution.is_terminal() {
                    bank.settle(&mut trial)?;
                }

                ctx.store.append(&BartRecord {
                    participant_id: ctx.session.participant_id,
                    trial_id: trial.trial_id(),
                    max_pumps: def.max_pumps,
                    shape: def.shape.clone(),
                    reward: outcome.gained,
                    pot: trial.pot(),
                    pumps: trial.steps(),
                    resolution: outcome.resolution,
                    total: bank.total(),
                    start,
                    end,
                })?;
                rows += 1;
                trial.mark_logged()?;

                match outcome.resolution {
                    Resolution::Continued => {}
                    Resolution::TimedOut => {
                        ctx.show_for(&Screen::TimedOut { task: TaskKind::Bart }, self.config.absent_notice)?;
                    }
                    Resolution::CashedOut => {
                        last_collected = bank.last_settled();
                        ctx.show_for(&Screen::NextRound, self.config.next_round_notice)?;
                    }
                    Resolution::Failed => {
                        last_collected = 0.0;
                        ctx.show_for(&Screen::BalloonPopped, self.config.pop_display)?;
                        ctx.show_for(&Screen::NextRound, self.config.next_round_notice)?;
                    }
                }

                trial.advance()?;
            }
        }

        ctx.show_for(
            &Screen::Final { task: TaskKind::Bart, total: bank.total(), practice: self.practice },
            self.config.final_hold,
        )?;

        log::info!(
            "bart: finished balloons={} total={:.2} popped={} timeouts={}",
            bank.settled_trials(),
            bank.total(),
            bank.failures(),
            bank.timeouts()
        );

        Ok(RunOutcome::Completed(RunSummary {
            task: TaskKind::Bart,
            trials: bank.settled_trials(),
            rows_written: rows,
            total: bank.total(),
            failures: bank.failures(),
            timeouts: bank.timeouts(),
            incidents: 0,
            ended_at: ctx.clock.now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_list_cycles_pump_limits() {
        let task = BartTask::new(BartConfig::default(), false);
        let trials = task.trial_list();
        assert_eq!(trials.len(), 13 * 30);

        let count = |limit: u32| trials.iter().filter(|t| t.max_pumps == limit).count();
        // 13 shapes over [8, 32, 128]: 5, 4 and 4 shapes respectively.
        assert_eq!(count(8), 5 * 30);
        assert_eq!(count(32), 4 * 30);
        assert_eq!(count(128), 4 * 30);
    }

    #[test]
    fn trial_order_is_the_same_for_everyone() {
        let a = BartTask::new(BartConfig::default(), false).trial_list();
        let b = BartTask::new(BartConfig::default(), false).trial_list();
        assert_eq!(a, b);
    }

    #[test]
    fn shape_labels_are_letters() {
        assert_eq!(shape_labels(3), vec!["a", "b", "c"]);
        assert_eq!(shape_labels(13).last().map(String::as_str), Some("m"));
    }
}
