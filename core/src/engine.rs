//! The task runner: opens the data files, builds the task for the
//! session and drives it to completion or abort.
//!
//! RUN ORDER (fixed):
//!   1. Validate config.
//!   2. Create the CSV file and write its header.
//!   3. Write the session manifest (no summary yet).
//!   4. Run the task.
//!   5. On completion only, rewrite the manifest with the summary.

use crate::{
    bart_task::BartTask,
    clock::Clock,
    config::TaskConfig,
    crcp_task::CrcpTask,
    error::{TaskError, TaskResult},
    interface::{InputSource, Presenter},
    psap_task::PsapTask,
    rng::RngBank,
    session::{SessionInfo, SessionManifest},
    store::{write_manifest, RecordStore},
    task::{ExperimentTask, RunOutcome, RunSummary, TaskContext},
    types::TaskKind,
};
use std::path::{Path, PathBuf};

pub struct TaskRunner {
    session:   SessionInfo,
    config:    TaskConfig,
    data_root: PathBuf,
}

impl TaskRunner {
    pub fn new(session: SessionInfo, config: TaskConfig, data_root: impl Into<PathBuf>) -> TaskResult<Self> {
        config.validate()?;
        Ok(Self { session, config, data_root: data_root.into() })
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn csv_path(&self) -> PathBuf {
        self.session.csv_path(&self.data_root)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.session.manifest_path(&self.data_root)
    }

    /// Build the task selected by the session.
    pub fn build_task(&self) -> TaskResult<Box<dyn ExperimentTask>> {
        let practice = self.session.practice;
        let task: Box<dyn ExperimentTask> = match self.session.task {
            TaskKind::Crcp => Box::new(CrcpTask::new(self.config.crcp.clone(), practice)),
            TaskKind::Bart => Box::new(BartTask::new(self.config.bart.clone(), practice)),
            TaskKind::Psap => {
                let condition = self.session.condition.ok_or(TaskError::MissingCondition)?;
                Box::new(PsapTask::new(self.config.psap.clone(), condition, practice))
            }
        };
        Ok(task)
    }

    /// Run the session's task against the given clock, display and input.
    pub fn run(
        &self,
        clock: &dyn Clock,
        presenter: &mut dyn Presenter,
        input: &mut dyn InputSource,
    ) -> TaskResult<RunOutcome> {
        let mut task = self.build_task()?;
        let csv_path = self.csv_path();
        let manifest_path = self.manifest_path();

        let mut store = RecordStore::create(&csv_path, task.header())?;
        self.write_manifest(&manifest_path, &csv_path, None)?;

        log::info!(
            "Starting {} session {} (participant {}, seed {}, practice {})",
            self.session.experiment_name,
            self.session.session_id,
            self.session.participant_id,
            self.session.seed,
            self.session.practice
        );

        let outcome = {
            let mut ctx = TaskContext {
                session: &self.session,
                config: &self.config,
                rng_bank: RngBank::new(self.session.seed),
                clock,
                presenter,
                input,
                store: &mut store,
            };
            task.run(&mut ctx)?
        };

        match &outcome {
            RunOutcome::Completed(summary) => {
                self.write_manifest(&manifest_path, &csv_path, Some(summary))?;
                log::info!(
                    "Finished {}: {} trial(s), {} row(s), total {:.2}",
                    task.kind(),
                    summary.trials,
                    summary.rows_written,
                    summary.total
                );
            }
            RunOutcome::Aborted { .. } => {
                log::info!("Data kept in {}", csv_path.display());
            }
        }
        Ok(outcome)
    }

    fn write_manifest(
        &self,
        path: &Path,
        csv_path: &Path,
        summary: Option<&RunSummary>,
    ) -> TaskResult<()> {
        let csv_file = csv_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        write_manifest(path, &SessionManifest { session: &self.session, csv_file, summary })
    }
}
