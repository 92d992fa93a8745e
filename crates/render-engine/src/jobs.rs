//! Job queue contract.
//!
//! The editor owns a job queue that orders renders and displays their
//! status. The render engine only admits jobs and pushes status messages;
//! the queue calls back into [`crate::ContainerActions::start_render`] when a
//! job may run.

use serde::{Deserialize, Serialize};

use montage_project_model::ContainerType;

/// Status of a queued render as the job queue displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Rendering,
    Completed,
}

/// Job category, one per container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ScriptGeneratorRender,
    FilterScriptRender,
    ProjectXmlRender,
}

impl JobType {
    pub fn for_container(container_type: ContainerType) -> Self {
        match container_type {
            ContainerType::ScriptGenerator => JobType::ScriptGeneratorRender,
            ContainerType::FilterScript => JobType::FilterScriptRender,
            ContainerType::ProjectXml => JobType::ProjectXmlRender,
        }
    }
}

/// A job entry or a status update for one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobQueueMessage {
    /// Job identity; the program id of the rendering clip.
    pub uid: String,

    pub job_type: JobType,
    pub status: JobStatus,

    /// Progress in `[0, 1]`.
    pub progress: f64,

    pub text: String,

    /// Seconds the renderer has been running.
    pub elapsed: f64,
}

/// The editor's render job queue.
pub trait JobQueue {
    /// Admit a new job in `Queued` state.
    fn add_job(&mut self, job: JobQueueMessage);

    /// Replace the displayed status of an admitted job.
    fn update_job_queue(&mut self, message: JobQueueMessage);
}

/// A job queue that keeps every message, for tools and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryJobQueue {
    pub jobs: Vec<JobQueueMessage>,
    pub updates: Vec<JobQueueMessage>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest message seen for `uid`, admission included.
    pub fn latest(&self, uid: &str) -> Option<&JobQueueMessage> {
        self.updates
            .iter()
            .rev()
            .chain(self.jobs.iter().rev())
            .find(|m| m.uid == uid)
    }

    /// Progress values pushed for `uid`, in order.
    pub fn progress_sequence(&self, uid: &str) -> Vec<f64> {
        self.updates
            .iter()
            .filter(|m| m.uid == uid)
            .map(|m| m.progress)
            .collect()
    }
}

impl JobQueue for MemoryJobQueue {
    fn add_job(&mut self, job: JobQueueMessage) {
        self.jobs.push(job);
    }

    fn update_job_queue(&mut self, message: JobQueueMessage) {
        self.updates.push(message);
    }
}
