//! Runs one or many jobs concurrently, supporting cancellation and awaiting termination.
//!
//! Each submitted job runs on its own `tokio` task (one logical worker per job, per §5); the
//! executor itself only tracks handles and join points, mirroring how this codebase's other
//! concurrent driver hands work off to `tokio::spawn` rather than managing an OS thread pool
//! directly.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch_loop::{Job, JobHandle};
use crate::config::ExecutorConfig;
use crate::error::Error;
use crate::report::JobReport;

/// Identifies one submitted job within a [`JobExecutor`].
pub type JobId = Uuid;

struct RunningJob {
    name: String,
    handle: JobHandle,
    task: tokio::task::JoinHandle<JobReport>,
}

/// Front end that runs jobs, supports cancelling any one of them by id, and can wait for every
/// in-flight job to finish.
pub struct JobExecutor {
    config: ExecutorConfig,
    jobs: Mutex<HashMap<JobId, RunningJob>>,
}

impl JobExecutor {
    /// Build an executor. The default config runs jobs with unbounded demand: `submit` always
    /// accepts a new job immediately rather than queuing behind a fixed worker count.
    pub fn new(config: ExecutorConfig) -> Self {
        JobExecutor {
            config,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn `job` onto its own task and return an id for cancelling or joining it later.
    /// Returns immediately; does not wait for the job to finish. Rejects the job if another job
    /// with the same name is already tracked by this executor (names are expected to identify a
    /// job the same way they key the `Monitor` registry).
    pub fn submit<T>(&self, job: Job<T>) -> Result<JobId, Error>
    where
        T: Clone + Send + Sync + 'static,
    {
        let name = job.name().to_string();
        let mut jobs = self.jobs.lock().expect("executor job registry lock poisoned");
        if jobs.values().any(|running| running.name == name) {
            return Err(Error::JobAlreadyRunning(name));
        }

        let id = Uuid::new_v4();
        let handle = job.handle();
        debug!(executor = ?self.config.label, job_id = %id, job = %name, "submitting job");
        let task = tokio::spawn(async move { job.run().await });
        jobs.insert(id, RunningJob { name, handle, task });
        Ok(id)
    }

    /// Run `job` to completion on the calling task, without going through the registry. Useful
    /// for callers that just want one job's report and have no need to cancel it externally.
    pub async fn execute<T>(&self, job: Job<T>) -> JobReport
    where
        T: Clone + Send + Sync + 'static,
    {
        job.run().await
    }

    /// Request cancellation of one submitted job. Only that job is affected; siblings keep
    /// running. Idempotent.
    pub fn cancel(&self, id: JobId) -> Result<(), Error> {
        let jobs = self.jobs.lock().expect("executor job registry lock poisoned");
        let running = jobs.get(&id).ok_or_else(|| Error::JobNotFound(id.to_string()))?;
        running.handle.cancel();
        Ok(())
    }

    /// Poll a submitted job's current status without removing it from the registry.
    pub fn status(&self, id: JobId) -> Result<crate::report::JobStatus, Error> {
        let jobs = self.jobs.lock().expect("executor job registry lock poisoned");
        let running = jobs.get(&id).ok_or_else(|| Error::JobNotFound(id.to_string()))?;
        Ok(running.handle.status())
    }

    /// Await one submitted job's report, removing it from the registry. Returns an error if no
    /// job with this id was ever submitted, or if the job's task panicked.
    pub async fn join(&self, id: JobId) -> Result<JobReport, Error> {
        let running = {
            let mut jobs = self.jobs.lock().expect("executor job registry lock poisoned");
            jobs.remove(&id).ok_or_else(|| Error::JobNotFound(id.to_string()))?
        };
        running.task.await.map_err(|err| Error::JobTaskFailed(err.to_string()))
    }

    /// Wait for every currently-submitted job to finish, or until `timeout` elapses.
    pub async fn await_termination(&self, timeout: Duration) -> Result<(), Error> {
        let ids: Vec<JobId> = {
            let jobs = self.jobs.lock().expect("executor job registry lock poisoned");
            jobs.keys().copied().collect()
        };

        let join_all = async {
            for id in ids {
                if let Err(err) = self.join(id).await {
                    warn!(job_id = %id, error = %err, "job task did not terminate cleanly");
                }
            }
        };

        tokio::time::timeout(timeout, join_all)
            .await
            .map_err(|_| Error::ExecutorShutdown)
    }

    /// Number of jobs currently tracked (submitted but not yet joined).
    pub fn active_count(&self) -> usize {
        self.jobs.lock().expect("executor job registry lock poisoned").len()
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        JobExecutor::new(ExecutorConfig::default())
    }
}
