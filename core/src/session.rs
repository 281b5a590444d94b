//! Session metadata: who is running which task, in which mode,
//! and where the data files go.

use crate::{
    error::{TaskError, TaskResult},
    task::RunSummary,
    types::{Condition, ParticipantId, TaskKind},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Used when the participant field is left empty.
pub const DEFAULT_PARTICIPANT_ID: ParticipantId = 9999;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id:      Uuid,
    pub experiment_name: String,
    pub task:            TaskKind,
    pub participant_id:  ParticipantId,
    pub condition:       Option<Condition>,
    pub practice:        bool,
    pub seed:            u64,
    /// Local start time, file-name safe.
    pub date_time:       String,
    pub version:         String,
}

impl SessionInfo {
    /// Validate the raw participant field and build the session.
    /// The psap task requires a condition; the other tasks ignore it.
    /// Without an explicit seed one is drawn from the session id.
    pub fn new(
        task: TaskKind,
        participant_input: &str,
        condition: Option<Condition>,
        practice: bool,
        seed: Option<u64>,
    ) -> TaskResult<Self> {
        let participant_id = parse_participant_id(participant_input)?;
        let condition = match task {
            TaskKind::Psap => Some(condition.ok_or(TaskError::MissingCondition)?),
            _ => None,
        };
        let session_id = Uuid::new_v4();
        let seed = seed.unwrap_or_else(|| session_id.as_u128() as u64);
        Ok(Self {
            session_id,
            experiment_name: task.experiment_name().to_string(),
            task,
            participant_id,
            condition,
            practice,
            seed,
            date_time: chrono::Local::now().format("%Y-%m-%d-%H-%M-%S-%6f").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Pin the timestamp, for reproducible file names in tests.
    pub fn with_date_time(mut self, date_time: impl Into<String>) -> Self {
        self.date_time = date_time.into();
        self
    }

    /// `<root>/<task>` for full runs, `<root>/tests` for practice.
    pub fn output_dir(&self, data_root: &Path) -> PathBuf {
        if self.practice {
            data_root.join("tests")
        } else {
            data_root.join(self.task.name())
        }
    }

    pub fn file_stem(&self) -> String {
        match self.condition {
            Some(condition) => format!(
                "{}-{}-{}-{}",
                self.task.name(),
                self.participant_id,
                condition,
                self.date_time
            ),
            None => format!("{}-{}-{}", self.task.name(), self.participant_id, self.date_time),
        }
    }

    pub fn csv_path(&self, data_root: &Path) -> PathBuf {
        self.output_dir(data_root).join(format!("{}.csv", self.file_stem()))
    }

    pub fn manifest_path(&self, data_root: &Path) -> PathBuf {
        self.output_dir(data_root).join(format!("{}.json", self.file_stem()))
    }
}

/// Numbers only. An empty field falls back to DEFAULT_PARTICIPANT_ID.
pub fn parse_participant_id(input: &str) -> TaskResult<ParticipantId> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_PARTICIPANT_ID);
    }
    trimmed
        .parse::<ParticipantId>()
        .map_err(|_| TaskError::InvalidParticipantId { input: trimmed.to_string() })
}

/// The JSON sidecar written next to the data file.
/// `summary` is only filled in when the run completes normally.
#[derive(Debug, Clone, Serialize)]
pub struct SessionManifest<'a> {
    pub session: &'a SessionInfo,
    pub csv_file: String,
    pub summary: Option<&'a RunSummary>,
}
