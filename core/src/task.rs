//! Task trait and the per-run context handed to it.
//!
//! RULE: Every task implements ExperimentTask.
//! The runner opens the data file, builds a TaskContext and calls
//! run() once. A task talks to the outside world only through the
//! context: screens out, keys in, rows to the store, time from the clock.

use crate::{
    clock::Clock,
    config::TaskConfig,
    error::{TaskError, TaskResult},
    interface::{InputRequest, InputSource, Key, Presenter, Screen},
    rng::RngBank,
    session::SessionInfo,
    store::RecordStore,
    types::{Seconds, TaskKind},
};
use serde::Serialize;

/// The contract every task must fulfill.
pub trait ExperimentTask {
    fn kind(&self) -> TaskKind;

    /// CSV column names for this task's records.
    fn header(&self) -> &'static [&'static str];

    /// Run every trial. Returns early with `RunOutcome::Aborted`
    /// when the participant presses the quit key.
    fn run(&mut self, ctx: &mut TaskContext<'_>) -> TaskResult<RunOutcome>;
}

pub struct TaskContext<'a> {
    pub session:   &'a SessionInfo,
    pub config:    &'a TaskConfig,
    pub rng_bank:  RngBank,
    pub clock:     &'a dyn Clock,
    pub presenter: &'a mut dyn Presenter,
    pub input:     &'a mut dyn InputSource,
    pub store:     &'a mut RecordStore,
}

impl TaskContext<'_> {
    /// Render a screen and block on the given keys.
    pub fn prompt(
        &mut self,
        screen: &Screen,
        accepted: &[Key],
        timeout: Option<Seconds>,
        step: u32,
    ) -> TaskResult<Option<Key>> {
        self.presenter.render(screen)?;
        self.input.await_input(&InputRequest::new(accepted, timeout, step))
    }

    /// Render a screen and wait for ENTER.
    pub fn acknowledge(&mut self, screen: &Screen) -> TaskResult<()> {
        self.presenter.render(screen)?;
        self.input
            .await_input(&InputRequest::acknowledge())?
            .ok_or(TaskError::InputClosed)?;
        Ok(())
    }

    /// Render a screen and keep it up for `secs`.
    pub fn show_for(&mut self, screen: &Screen, secs: Seconds) -> TaskResult<()> {
        self.presenter.render(screen)?;
        self.clock.sleep(secs);
        Ok(())
    }

    /// Build the abort outcome after a quit key.
    pub fn aborted(&self, trials_started: u32) -> RunOutcome {
        log::warn!(
            "{} aborted by participant {} after {trials_started} trial(s); {} row(s) kept",
            self.session.task,
            self.session.participant_id,
            self.store.rows_written()
        );
        RunOutcome::Aborted {
            trials_started,
            rows_written: self.store.rows_written(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub task:         TaskKind,
    pub trials:       u32,
    pub rows_written: u64,
    /// Final running total (points banked, or final score).
    pub total:        f64,
    pub failures:     u32,
    pub timeouts:     u32,
    pub incidents:    u32,
    pub ended_at:     Seconds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Quit key pressed. No summary is written.
    Aborted { trials_started: u32, rows_written: u64 },
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::Aborted { .. } => None,
        }
    }

    pub fn rows_written(&self) -> u64 {
        match self {
            Self::Completed(summary) => summary.rows_written,
            Self::Aborted { rows_written, .. } => *rows_written,
        }
    }
}
