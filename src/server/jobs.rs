//! Background simulation jobs for the HTTP API.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use serde::Serialize;
use uuid::Uuid;

use crate::data::DataRegistry;
use crate::parallel::{spawn_simulation_with_token, CancelToken, HostMessage};
use crate::simulation::{RunHistory, RunRecord, SimulationInput, SimulationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::Running
    }
}

/// What the API reports about a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at_tick: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<SimulationResult>>,
}

struct Job {
    snapshot: JobSnapshot,
    cancel: CancelToken,
}

/// Finished jobs kept for polling. Older ones are evicted; their runs stay in the history.
pub const DEFAULT_FINISHED_JOB_CAPACITY: usize = 256;

#[derive(Default)]
struct JobTable {
    by_id: HashMap<Uuid, Job>,
    /// Terminal jobs, oldest first.
    finished: VecDeque<Uuid>,
}

impl JobTable {
    fn insert(&mut self, job_id: Uuid, job: Job) {
        self.by_id.insert(job_id, job);
    }

    fn get(&self, job_id: &Uuid) -> Option<&Job> {
        self.by_id.get(job_id)
    }

    fn get_mut(&mut self, job_id: &Uuid) -> Option<&mut Job> {
        self.by_id.get_mut(job_id)
    }

    fn finish(&mut self, job_id: Uuid, capacity: usize) {
        self.finished.push_back(job_id);
        while self.finished.len() > capacity {
            if let Some(evicted) = self.finished.pop_front() {
                self.by_id.remove(&evicted);
                log::debug!("evicted finished job {evicted}");
            }
        }
    }
}

pub struct JobRegistry {
    jobs: Mutex<JobTable>,
    finished_capacity: usize,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_finished_capacity(DEFAULT_FINISHED_JOB_CAPACITY)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_finished_capacity(finished_capacity: usize) -> Self {
        Self {
            jobs: Mutex::new(JobTable::default()),
            finished_capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobTable> {
        // A poisoned map only means a tracker thread panicked mid-update; the data is still
        // usable.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts `input` on a worker thread and returns its job id right away.
    pub fn start(
        self: &Arc<Self>,
        registry: &DataRegistry,
        history: Arc<dyn RunHistory>,
        input: SimulationInput,
    ) -> Uuid {
        let job_id = Uuid::new_v4();
        let cancel = CancelToken::new();
        self.lock().insert(
            job_id,
            Job {
                snapshot: JobSnapshot {
                    job_id,
                    status: JobStatus::Running,
                    progress: 0.0,
                    run_id: None,
                    error: None,
                    cancelled_at_tick: None,
                    result: None,
                },
                cancel: cancel.clone(),
            },
        );

        let handle = spawn_simulation_with_token(
            Arc::clone(&registry.game_data),
            Arc::clone(&registry.prices),
            input.clone(),
            cancel,
        );
        log::info!("job {job_id} started for zone '{}'", input.zone_hrid);
        let jobs = Arc::clone(self);
        thread::spawn(move || {
            for message in handle.receiver.iter() {
                let run_id = match &message {
                    HostMessage::Result(result) => {
                        let record = RunRecord::new(input.clone(), result.as_ref().clone());
                        match history.save(record) {
                            Ok(id) => Some(id),
                            Err(err) => {
                                log::warn!("job {job_id}: run not saved to history: {err}");
                                None
                            }
                        }
                    }
                    _ => None,
                };
                jobs.apply(job_id, message, run_id);
            }
        });
        job_id
    }

    fn apply(&self, job_id: Uuid, message: HostMessage, run_id: Option<Uuid>) {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(&job_id) else {
            return;
        };
        let was_running = !job.snapshot.status.is_terminal();
        let snapshot = &mut job.snapshot;
        match message {
            HostMessage::Progress(fraction) => snapshot.progress = fraction,
            HostMessage::Result(result) => {
                snapshot.status = JobStatus::Completed;
                snapshot.progress = 1.0;
                snapshot.run_id = run_id;
                snapshot.result = Some(result);
            }
            HostMessage::Error(error) => {
                snapshot.status = JobStatus::Failed;
                snapshot.error = Some(error);
            }
            HostMessage::Cancelled { tick } => {
                snapshot.status = JobStatus::Cancelled;
                snapshot.cancelled_at_tick = Some(tick);
            }
        }
        if was_running && snapshot.status.is_terminal() {
            jobs.finish(job_id, self.finished_capacity);
        }
    }

    pub fn snapshot(&self, job_id: &Uuid) -> Option<JobSnapshot> {
        self.lock().get(job_id).map(|job| job.snapshot.clone())
    }

    /// Asks a running job to stop. Returns None for unknown jobs.
    pub fn cancel(&self, job_id: &Uuid) -> Option<JobSnapshot> {
        let jobs = self.lock();
        let job = jobs.get(job_id)?;
        if !job.snapshot.status.is_terminal() {
            job.cancel.cancel();
        }
        Some(job.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_job() -> (JobRegistry, Uuid, CancelToken) {
        let registry = JobRegistry::new();
        let job_id = Uuid::new_v4();
        let cancel = CancelToken::new();
        registry.lock().insert(
            job_id,
            Job {
                snapshot: JobSnapshot {
                    job_id,
                    status: JobStatus::Running,
                    progress: 0.0,
                    run_id: None,
                    error: None,
                    cancelled_at_tick: None,
                    result: None,
                },
                cancel: cancel.clone(),
            },
        );
        (registry, job_id, cancel)
    }

    #[test]
    fn messages_drive_the_snapshot() {
        let (registry, id, _) = registry_with_job();
        registry.apply(id, HostMessage::Progress(0.25), None);
        assert_eq!(registry.snapshot(&id).map(|s| s.progress), Some(0.25));
        registry.apply(id, HostMessage::Cancelled { tick: 9 }, None);
        let snap = registry.snapshot(&id).expect("known job");
        assert_eq!(snap.status, JobStatus::Cancelled);
        assert_eq!(snap.cancelled_at_tick, Some(9));
    }

    #[test]
    fn oldest_finished_jobs_are_evicted() {
        let registry = JobRegistry::with_finished_capacity(1);
        let mut ids = Vec::new();
        for tick in 0..2 {
            let job_id = Uuid::new_v4();
            registry.lock().insert(
                job_id,
                Job {
                    snapshot: JobSnapshot {
                        job_id,
                        status: JobStatus::Running,
                        progress: 0.0,
                        run_id: None,
                        error: None,
                        cancelled_at_tick: None,
                        result: None,
                    },
                    cancel: CancelToken::new(),
                },
            );
            registry.apply(job_id, HostMessage::Cancelled { tick }, None);
            ids.push(job_id);
        }
        assert!(registry.snapshot(&ids[0]).is_none());
        assert_eq!(
            registry.snapshot(&ids[1]).map(|s| s.status),
            Some(JobStatus::Cancelled)
        );
    }

    #[test]
    fn cancel_flips_the_token_of_running_jobs_only() {
        let (registry, id, token) = registry_with_job();
        assert!(registry.cancel(&id).is_some());
        assert!(token.is_cancelled());
        assert!(registry.cancel(&Uuid::new_v4()).is_none());
    }
}
