// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process job runner.
//!
//! [`LocalJobRunner`] spawns one tokio task per job. The task sleeps until the
//! job is due, then waits for one of `workers` semaphore permits before handing
//! the job to the [`TaskExecutor`]. Job records stay in a shared map so callers
//! can inspect them once they finish, until the [`JobRetention`] policy drops
//! them. Pending, scheduled and running jobs are never dropped.
//!
//! Scheduled jobs can be cancelled until they acquire a permit; a running job
//! always runs to completion.

use crate::config::JobRetention;
use crate::errors::SyncError;
use crate::jobs::{EnqueueRequest, Job, JobId, JobQueue, JobStatus, JobSubject, TaskExecutor};
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

struct RunnerInner {
    jobs: Mutex<BTreeMap<JobId, Job>>,
    handles: Mutex<HashMap<JobId, AbortHandle>>,
    next_id: AtomicU64,
    permits: Arc<Semaphore>,
    executor: Arc<dyn TaskExecutor>,
    finished: watch::Sender<u64>,
    retention: JobRetention,
}

impl RunnerInner {
    fn jobs(&self) -> MutexGuard<'_, BTreeMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<JobId, AbortHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded, schedule-aware job runner backed by tokio tasks.
#[derive(Clone)]
pub struct LocalJobRunner {
    inner: Arc<RunnerInner>,
}

impl LocalJobRunner {
    /// Create a runner executing at most `workers` jobs at once, keeping
    /// finished jobs per the default retention.
    #[must_use]
    pub fn new(executor: Arc<dyn TaskExecutor>, workers: usize) -> Self {
        Self::with_retention(executor, workers, JobRetention::default())
    }

    /// Create a runner with an explicit finished-job retention.
    #[must_use]
    pub fn with_retention(
        executor: Arc<dyn TaskExecutor>,
        workers: usize,
        retention: JobRetention,
    ) -> Self {
        let (finished, _) = watch::channel(0);
        Self {
            inner: Arc::new(RunnerInner {
                jobs: Mutex::new(BTreeMap::new()),
                handles: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                permits: Arc::new(Semaphore::new(workers.max(1))),
                executor,
                finished,
                retention,
            }),
        }
    }

    /// Snapshot of a job.
    #[must_use]
    pub fn job(&self, id: JobId) -> Option<Job> {
        self.inner.jobs().get(&id).cloned()
    }

    /// Snapshot of every known job, in id order.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.inner.jobs().values().cloned().collect()
    }

    /// Wait until job `id` terminates and return it.
    ///
    /// Returns `None` if the job does not exist, was cancelled, or was
    /// dropped by the retention policy before it could be read.
    pub async fn wait_for(&self, id: JobId) -> Option<Job> {
        let mut finished = self.inner.finished.subscribe();
        loop {
            match self.job(id) {
                Some(job) if job.status.is_terminal() => return Some(job),
                Some(_) => {}
                None => return None,
            }
            if finished.changed().await.is_err() {
                return self.job(id);
            }
        }
    }

    /// Abort every job that has not started yet. Running jobs finish.
    pub fn shutdown(&self) {
        let handles: Vec<AbortHandle> = self.inner.handles().drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.abort();
        }
        if !handles.is_empty() {
            info!(count = handles.len(), "Aborted queued jobs");
        }
    }

    fn spawn(&self, id: JobId, due: Option<DateTime<Utc>>) {
        let runner = self.clone();
        // Hold the handle lock across spawn so the task cannot look up its
        // own handle before it is registered.
        let mut handles = self.inner.handles();
        let handle = tokio::spawn(async move { runner.run(id, due).await });
        handles.insert(id, handle.abort_handle());
    }

    async fn run(self, id: JobId, due: Option<DateTime<Utc>>) {
        if let Some(at) = due {
            let delay = (at - Utc::now()).to_std().unwrap_or_default();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let was_scheduled = match self.inner.jobs().get_mut(&id) {
                Some(job) if job.status == JobStatus::Scheduled => {
                    job.status = JobStatus::Pending;
                    true
                }
                _ => false,
            };
            if was_scheduled {
                metrics::record_job_unscheduled();
            }
        }

        let Ok(_permit) = Arc::clone(&self.inner.permits).acquire_owned().await else {
            return;
        };

        // Past this point the job can no longer be cancelled.
        let job = {
            let jobs = self.inner.jobs();
            self.inner.handles().remove(&id);
            jobs.get(&id).cloned()
        };
        let Some(mut job) = job else {
            return;
        };

        debug!(job_id = id, job = %job.name, subject = %job.subject, "Running job");
        let started = Instant::now();
        let result = self.inner.executor.execute(&mut job, &self).await;

        if !job.status.is_terminal() {
            job.terminate(if result.is_ok() {
                JobStatus::Completed
            } else {
                JobStatus::Errored
            });
        }
        if let Err(e) = &result {
            metrics::record_error(job.task.as_str(), e.status_reason());
            warn!(
                job_id = id,
                job = %job.name,
                subject = %job.subject,
                reason = e.status_reason(),
                "Job failed: {e}"
            );
        }
        metrics::record_task_finished(job.task.as_str(), job.status.as_str(), started.elapsed());

        self.inner.jobs().insert(id, job);
        let pruned = self.prune_finished(id);
        if pruned > 0 {
            debug!(count = pruned, "Dropped finished jobs past retention");
        }
        self.inner.finished.send_modify(|n| *n += 1);
    }

    /// Drop finished jobs past their age, then the oldest ones beyond the
    /// retained count. `keep` is the job that just finished and always stays.
    fn prune_finished(&self, keep: JobId) -> usize {
        let retention = &self.inner.retention;
        let cutoff = Utc::now() - retention.max_age();
        let mut jobs = self.inner.jobs();

        let finished: Vec<(JobId, DateTime<Utc>)> = jobs
            .values()
            .filter(|job| job.status.is_terminal())
            .map(|job| (job.id, job.completed.unwrap_or(job.created)))
            .collect();
        let mut excess = finished.len().saturating_sub(retention.max_finished);

        let mut dropped = Vec::new();
        for (id, completed) in finished {
            if id == keep {
                continue;
            }
            if excess > 0 {
                excess -= 1;
                dropped.push(id);
            } else if completed <= cutoff {
                dropped.push(id);
            }
        }
        for id in &dropped {
            jobs.remove(id);
        }
        dropped.len()
    }
}

#[async_trait]
impl JobQueue for LocalJobRunner {
    async fn enqueue(&self, request: EnqueueRequest) -> Result<JobId, SyncError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(id, request);
        let due = job.scheduled;
        if job.status == JobStatus::Scheduled {
            metrics::record_job_scheduled();
        }
        debug!(
            job_id = id,
            job = %job.name,
            subject = %job.subject,
            scheduled = ?job.scheduled,
            "Enqueued job"
        );
        self.inner.jobs().insert(id, job);
        self.spawn(id, due);
        Ok(id)
    }

    async fn cancel_scheduled(&self, subject: &JobSubject, name: &str) -> usize {
        let cancelled = {
            let mut jobs = self.inner.jobs();
            let mut handles = self.inner.handles();
            let ids: Vec<JobId> = jobs
                .values()
                .filter(|job| {
                    &job.subject == subject
                        && job.name == name
                        && matches!(job.status, JobStatus::Pending | JobStatus::Scheduled)
                        && handles.contains_key(&job.id)
                })
                .map(|job| job.id)
                .collect();
            for id in &ids {
                if let Some(handle) = handles.remove(id) {
                    handle.abort();
                }
                if let Some(job) = jobs.remove(id) {
                    if job.status == JobStatus::Scheduled {
                        metrics::record_job_unscheduled();
                    }
                }
            }
            ids.len()
        };
        if cancelled > 0 {
            info!(subject = %subject, job = %name, count = cancelled, "Cancelled scheduled jobs");
            self.inner.finished.send_modify(|n| *n += 1);
        }
        cancelled
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod runner_tests;
