//! Polls active jobs until they reach a terminal status.
//!
//! One poll task runs per tracked job. Each task asks its [`StatusSource`]
//! for the job's status on a fixed interval and forwards what it learns as
//! [`TrackerEvent`]s. A task ends on its own once the job is terminal, when
//! it is untracked, or when the tracker is dropped.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};
use crate::db::enums::JobStatus;
use crate::models::{Job, JobStatusResponse};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const UNKNOWN_ERROR: &str = "Unknown error";

/// Where the tracker reads job state from.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn job_status(&self, id: Uuid) -> Result<JobStatusResponse, ClientError>;
    async fn job_detail(&self, id: Uuid) -> Result<Job, ClientError>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn job_status(&self, id: Uuid) -> Result<JobStatusResponse, ClientError> {
        self.get_job_status(id).await
    }

    async fn job_detail(&self, id: Uuid) -> Result<Job, ClientError> {
        self.get_job(id).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A poll returned a non-terminal status.
    Progress(JobStatusResponse),
    /// The job completed. `detail` is the full record when it could be fetched.
    Completed { id: Uuid, detail: Option<Job> },
    Failed { id: Uuid, message: String },
    /// The job left the active states without completing or failing.
    Stopped { id: Uuid, status: JobStatus },
}

impl TrackerEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            Self::Progress(status) => status.id,
            Self::Completed { id, .. } | Self::Failed { id, .. } | Self::Stopped { id, .. } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

pub struct JobTracker<S: StatusSource> {
    source: Arc<S>,
    interval: Duration,
    events: mpsc::UnboundedSender<TrackerEvent>,
    tasks: HashMap<Uuid, JoinHandle<()>>,
}

impl<S: StatusSource> JobTracker<S> {
    pub fn new(source: Arc<S>) -> (Self, mpsc::UnboundedReceiver<TrackerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let tracker = Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            events,
            tasks: HashMap::new(),
        };

        (tracker, receiver)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts polling `job` if it is pending or processing. Returns whether a
    /// poll task is running for it afterwards.
    pub fn track(&mut self, job: &Job) -> bool {
        self.tasks.retain(|_, handle| !handle.is_finished());

        if !job.status.is_active() {
            return false;
        }
        if self.tasks.contains_key(&job.id) {
            return true;
        }

        let handle = tokio::spawn(poll_job(
            self.source.clone(),
            job.id,
            self.interval,
            self.events.clone(),
        ));
        self.tasks.insert(job.id, handle);
        tracing::debug!("Tracking job {}", job.id);

        true
    }

    pub fn untrack(&mut self, id: Uuid) {
        if let Some(handle) = self.tasks.remove(&id) {
            handle.abort();
            tracing::debug!("Stopped tracking job {}", id);
        }
    }

    pub fn is_tracking(&self, id: Uuid) -> bool {
        self.tasks
            .get(&id)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn tracked_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl<S: StatusSource> Drop for JobTracker<S> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

async fn poll_job<S: StatusSource>(
    source: Arc<S>,
    id: Uuid,
    period: Duration,
    events: mpsc::UnboundedSender<TrackerEvent>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let status = match source.job_status(id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Polling job {} failed, retrying: {}", id, e);
                continue;
            }
        };

        let event = match status.status {
            JobStatus::Pending | JobStatus::Processing => TrackerEvent::Progress(status),
            JobStatus::Completed => {
                let detail = match source.job_detail(id).await {
                    Ok(job) => Some(job),
                    Err(e) => {
                        tracing::warn!("Could not fetch completed job {}: {}", id, e);
                        None
                    }
                };
                TrackerEvent::Completed { id, detail }
            }
            JobStatus::Failed => TrackerEvent::Failed {
                id,
                message: status
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            },
            other => TrackerEvent::Stopped { id, status: other },
        };

        let terminal = event.is_terminal();
        if events.send(event).is_err() || terminal {
            break;
        }
    }
}
