//! The risk-trial state machine shared by the card and balloon tasks.
//!
//! PHASES (one pass per input):
//!   Presenting → AwaitingInput → Resolved(..) → Logged → Presenting | Finished
//!
//! RULES:
//!   - The pot starts at zero and never goes negative.
//!   - Failure and timeout zero the pot before anything is settled.
//!   - A finished trial is settled into the Bank exactly once.
//!   - Failure odds on a draw are 1 / steps remaining, so the last
//!     remaining step always fails.

use crate::{
    error::{TaskError, TaskResult},
    rng::TaskRng,
    types::TrialId,
};
use serde::{Deserialize, Serialize};

/// How one input resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Draw or pump survived; the pot grew.
    Continued,
    /// Participant banked the pot.
    CashedOut,
    /// The risk check fired; the pot is lost.
    Failed,
    /// No input inside the response window; the pot is forfeited.
    TimedOut,
}

impl Resolution {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continued)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Presenting,
    AwaitingInput,
    Resolved(Resolution),
    Logged,
    Finished,
}

impl TrialPhase {
    fn name(&self) -> &'static str {
        match self {
            Self::Presenting => "presenting",
            Self::AwaitingInput => "awaiting input",
            Self::Resolved(_) => "resolved",
            Self::Logged => "logged",
            Self::Finished => "finished",
        }
    }
}

/// What the participant asked for. A timeout is the absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialInput {
    Continue,
    CashOut,
}

/// Result of resolving one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub resolution: Resolution,
    /// Added to the pot by this step (0 unless Continued).
    pub gained: f64,
    /// Failure odds that applied to this step, if it was a draw.
    pub failure_probability: Option<f64>,
    pub steps: u32,
    pub pot: f64,
}

#[derive(Debug, Clone)]
pub struct RiskTrial {
    trial_id:   TrialId,
    max_steps:  u32,
    steps:      u32,
    pot:        f64,
    phase:      TrialPhase,
    terminal:   Option<Resolution>,
    settled:    bool,
}

impl RiskTrial {
    pub fn new(trial_id: TrialId, max_steps: u32) -> Self {
        Self {
            trial_id,
            max_steps,
            steps: 0,
            pot: 0.0,
            phase: TrialPhase::Presenting,
            terminal: None,
            settled: false,
        }
    }

    pub fn trial_id(&self) -> TrialId { self.trial_id }
    pub fn max_steps(&self) -> u32 { self.max_steps }
    /// Draws or pumps attempted so far, including a failing one.
    pub fn steps(&self) -> u32 { self.steps }
    pub fn pot(&self) -> f64 { self.pot }
    pub fn phase(&self) -> TrialPhase { self.phase }
    pub fn outcome(&self) -> Option<Resolution> { self.terminal }
    pub fn is_finished(&self) -> bool { self.phase == TrialPhase::Finished }

    pub fn remaining(&self) -> u32 {
        self.max_steps.saturating_sub(self.steps)
    }

    /// Odds that the next draw fails.
    pub fn failure_probability(&self) -> f64 {
        match self.remaining() {
            0 => 1.0,
            n => 1.0 / n as f64,
        }
    }

    /// Presenting → AwaitingInput, once the decision screen is up.
    pub fn begin_wait(&mut self) -> TaskResult<()> {
        self.expect(TrialPhase::Presenting, "wait for input")?;
        self.phase = TrialPhase::AwaitingInput;
        Ok(())
    }

    /// AwaitingInput → Resolved. `input == None` means the window closed.
    /// `step_reward` is what a surviving draw adds to the pot.
    pub fn resolve(
        &mut self,
        input: Option<TrialInput>,
        step_reward: f64,
        rng: &mut TaskRng,
    ) -> TaskResult<StepOutcome> {
        self.expect(TrialPhase::AwaitingInput, "resolve input")?;

        let mut gained = 0.0;
        let mut failure_probability = None;
        let resolution = match input {
            None => {
                self.pot = 0.0;
                Resolution::TimedOut
            }
            Some(TrialInput::CashOut) => Resolution::CashedOut,
            Some(TrialInput::Continue) => {
                let p = self.failure_probability();
                failure_probability = Some(p);
                self.steps += 1;
                if rng.chance(p) {
                    self.pot = 0.0;
                    Resolution::Failed
                } else {
                    gained = step_reward.max(0.0);
                    self.pot += gained;
                    Resolution::Continued
                }
            }
        };

        if resolution.is_terminal() {
            self.terminal = Some(resolution);
        }
        self.phase = TrialPhase::Resolved(resolution);

        log::debug!(
            "trial={} step={} {:?} pot={:.2} p_fail={:?}",
            self.trial_id, self.steps, resolution, self.pot, failure_probability
        );

        Ok(StepOutcome {
            resolution,
            gained,
            failure_probability,
            steps: self.steps,
            pot: self.pot,
        })
    }

    /// Resolved → Logged, once the record for this step is written.
    pub fn mark_logged(&mut self) -> TaskResult<()> {
        match self.phase {
            TrialPhase::Resolved(_) => {
                self.phase = TrialPhase::Logged;
                Ok(())
            }
            phase => Err(TaskError::InvalidTransition { phase: phase.name(), action: "mark logged" }),
        }
    }

    /// Logged → Presenting for the next step, or Finished.
    pub fn advance(&mut self) -> TaskResult<TrialPhase> {
        self.expect(TrialPhase::Logged, "advance")?;
        self.phase = if self.terminal.is_some() {
            TrialPhase::Finished
        } else {
            TrialPhase::Presenting
        };
        Ok(self.phase)
    }

    fn expect(&self, phase: TrialPhase, action: &'static str) -> TaskResult<()> {
        if self.phase != phase {
            return Err(TaskError::InvalidTransition { phase: self.phase.name(), action });
        }
        Ok(())
    }
}

/// The running total carried across trials.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Bank {
    total:          f64,
    last_settled:   f64,
    settled_trials: u32,
    failures:       u32,
    timeouts:       u32,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> f64 { self.total }
    /// Amount credited by the most recent settlement.
    pub fn last_settled(&self) -> f64 { self.last_settled }
    pub fn settled_trials(&self) -> u32 { self.settled_trials }
    pub fn failures(&self) -> u32 { self.failures }
    pub fn timeouts(&self) -> u32 { self.timeouts }

    /// Credit a trial that has reached a terminal outcome.
    /// Cash-out adds the pot; failure and timeout add nothing.
    pub fn settle(&mut self, trial: &mut RiskTrial) -> TaskResult<f64> {
        let outcome = trial
            .terminal
            .ok_or(TaskError::TrialNotFinished { trial_id: trial.trial_id })?;
        if trial.settled {
            return Err(TaskError::AlreadySettled { trial_id: trial.trial_id });
        }

        let credited = match outcome {
            Resolution::CashedOut => trial.pot,
            Resolution::Failed => {
                self.failures += 1;
                0.0
            }
            Resolution::TimedOut => {
                self.timeouts += 1;
                0.0
            }
            Resolution::Continued => return Err(TaskError::TrialNotFinished { trial_id: trial.trial_id }),
        };

        trial.settled = true;
        self.total += credited;
        self.last_settled = credited;
        self.settled_trials += 1;
        Ok(credited)
    }
}
