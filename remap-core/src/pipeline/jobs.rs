use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::cache::layout::{ArtifactKind, CacheKey};
use crate::error::{RemapError, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Status surface for one long-running build, pollable by callers other than
/// the one that started it.
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub stage: ArtifactKind,
    pub key: CacheKey,
    pub state: JobState,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// In-memory job table, process-lifetime only (cleared on restart, never
/// persisted). A failed build is never retried under the same id; the next
/// attempt gets a fresh job.
///
/// Progress policy: values above 100 clamp to 100; decreasing values are
/// ignored so progress stays monotonic; updates to a settled job are errors.
#[derive(Default)]
pub struct JobTracker {
    jobs: DashMap<Uuid, Job>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, stage: ArtifactKind, key: &CacheKey) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.insert(
            id,
            Job {
                id,
                stage,
                key: key.clone(),
                state: JobState::Pending,
                progress: 0,
                error: None,
            },
        );
        tracing::debug!(%id, %stage, %key, "job started");
        id
    }

    pub fn update_progress(&self, id: Uuid, percent: u8) -> Result<()> {
        let mut job = self.jobs.get_mut(&id).ok_or(RemapError::JobNotFound(id))?;
        if job.state.is_terminal() {
            return Err(RemapError::JobTerminal(id));
        }
        job.state = JobState::Running;
        let percent = percent.min(100);
        if percent > job.progress {
            job.progress = percent;
        }
        Ok(())
    }

    pub fn complete(&self, id: Uuid) -> Result<()> {
        self.settle(id, JobState::Completed, None)
    }

    pub fn fail(&self, id: Uuid, message: impl Into<String>) -> Result<()> {
        self.settle(id, JobState::Failed, Some(message.into()))
    }

    fn settle(&self, id: Uuid, state: JobState, error: Option<String>) -> Result<()> {
        let mut job = self.jobs.get_mut(&id).ok_or(RemapError::JobNotFound(id))?;
        if job.state.is_terminal() {
            return Err(RemapError::JobTerminal(id));
        }
        job.state = state;
        if state == JobState::Completed {
            job.progress = 100;
        }
        job.error = error;
        tracing::debug!(%id, ?state, "job settled");
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.value().clone())
    }

    /// Snapshot of every tracked job, for a status listing.
    pub fn jobs(&self) -> Vec<Job> {
        let mut all: Vec<Job> = self.jobs.iter().map(|j| j.value().clone()).collect();
        all.sort_by_key(|j| j.id);
        all
    }
}
