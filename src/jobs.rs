// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Job records and the queue contract.
//!
//! A [`Job`] is the unit the runner schedules and the record an operator reads
//! afterwards: its status, timestamps, a structured log, one output row per
//! record operation and, on failure, the error string.
//!
//! Every job log call is mirrored to `tracing` at the matching level, so a job
//! log and the process log always agree.

use crate::errors::SyncError;
use crate::inventory::AddressId;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Job identifier, unique per runner.
pub type JobId = u64;

/// Lifecycle state of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued for immediate execution
    Pending,
    /// Waiting for its scheduled time
    Scheduled,
    /// Executing
    Running,
    /// Finished without error
    Completed,
    /// Finished with an error
    Errored,
}

impl JobStatus {
    /// Returns true once the job can no longer change state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }

    /// Lower-case name, used as a metrics label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Errored => "errored",
        }
    }
}

/// Severity of a job log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress detail
    Debug,
    /// Notable step
    Info,
    /// Task finished
    Success,
    /// Skipped work, nothing failed
    Warning,
    /// Task failed
    Failure,
}

impl LogLevel {
    /// Lower-case name as serialized.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
        }
    }
}

/// One job log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log message
    pub message: String,
    /// Severity
    pub status: LogLevel,
}

/// Record operation performed by a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordAction {
    /// rrset replaced
    Create,
    /// rrset deleted
    Delete,
}

impl RecordAction {
    /// Upper-case name, used in job output and as a metrics label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record operation sent to one server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Operation
    pub action: RecordAction,
    /// Rendered record
    pub rr: String,
    /// Zone name
    pub zone: String,
    /// API server name
    pub server: String,
}

/// Structured job data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobData {
    /// Log lines in order
    #[serde(default)]
    pub log: Vec<LogEntry>,
    /// Record operations in order
    #[serde(default)]
    pub output: Vec<OutputRow>,
    /// Error string of a failed per-address task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

/// What a job works on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobSubject {
    /// An inventory address
    Address(AddressId),
    /// A zone, by name
    Zone(String),
}

impl fmt::Display for JobSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(id) => write!(f, "address {id}"),
            Self::Zone(name) => write!(f, "zone {name}"),
        }
    }
}

/// Which task a job runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    /// Create the forward and reverse records of one address
    UpdateAddress,
    /// Reconcile a whole zone
    SyncZone,
}

impl TaskKind {
    /// Metrics label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdateAddress => "update_address",
            Self::SyncZone => "sync_zone",
        }
    }
}

/// Parameters of a new job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnqueueRequest {
    /// Task to run
    pub task: TaskKind,
    /// Address or zone the task works on
    pub subject: JobSubject,
    /// Job name
    pub name: String,
    /// User on whose behalf the job runs
    pub user: Option<String>,
    /// Run no earlier than this; immediately when unset
    pub schedule_at: Option<DateTime<Utc>>,
    /// Repeat every this many minutes
    pub interval_minutes: Option<u32>,
}

impl EnqueueRequest {
    /// Immediate single-address update.
    #[must_use]
    pub fn update_address(id: AddressId, name: &str, user: Option<String>) -> Self {
        Self {
            task: TaskKind::UpdateAddress,
            subject: JobSubject::Address(id),
            name: name.to_string(),
            user,
            schedule_at: None,
            interval_minutes: None,
        }
    }

    /// Zone sync, optionally scheduled and recurring.
    #[must_use]
    pub fn sync_zone(
        zone: &str,
        name: &str,
        user: Option<String>,
        schedule_at: Option<DateTime<Utc>>,
        interval_minutes: Option<u32>,
    ) -> Self {
        Self {
            task: TaskKind::SyncZone,
            subject: JobSubject::Zone(zone.to_string()),
            name: name.to_string(),
            user,
            schedule_at,
            interval_minutes,
        }
    }
}

/// A scheduled unit of work and its outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Identifier
    pub id: JobId,
    /// Job name
    pub name: String,
    /// Task to run
    pub task: TaskKind,
    /// Address or zone the task works on
    pub subject: JobSubject,
    /// Requesting user
    pub user: Option<String>,
    /// When the job was enqueued
    pub created: DateTime<Utc>,
    /// When the job is due, if it was scheduled
    pub scheduled: Option<DateTime<Utc>>,
    /// When the job started
    pub started: Option<DateTime<Utc>>,
    /// When the job terminated
    pub completed: Option<DateTime<Utc>>,
    /// Repeat interval in minutes
    pub interval_minutes: Option<u32>,
    /// Current state
    pub status: JobStatus,
    /// Log, output rows and error string
    pub data: JobData,
}

impl Job {
    /// Create a job from a request.
    #[must_use]
    pub fn new(id: JobId, request: EnqueueRequest) -> Self {
        let created = Utc::now();
        let status = match request.schedule_at {
            Some(at) if at > created => JobStatus::Scheduled,
            _ => JobStatus::Pending,
        };
        Self {
            id,
            name: request.name,
            task: request.task,
            subject: request.subject,
            user: request.user,
            created,
            scheduled: request.schedule_at,
            started: None,
            completed: None,
            interval_minutes: request.interval_minutes,
            status,
            data: JobData::default(),
        }
    }

    /// Mark the job running.
    pub fn start(&mut self) {
        self.started = Some(Utc::now());
        self.status = JobStatus::Running;
    }

    /// Mark the job finished with `status`.
    pub fn terminate(&mut self, status: JobStatus) {
        self.completed = Some(Utc::now());
        self.status = status;
    }

    fn push_log(&mut self, status: LogLevel, message: String) {
        self.data.log.push(LogEntry { message, status });
    }

    /// Log progress detail.
    pub fn log_debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(job_id = self.id, job = %self.name, "{message}");
        self.push_log(LogLevel::Debug, message);
    }

    /// Log a notable step.
    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(job_id = self.id, job = %self.name, "{message}");
        self.push_log(LogLevel::Info, message);
    }

    /// Log successful completion.
    pub fn log_success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(job_id = self.id, job = %self.name, "{message}");
        self.push_log(LogLevel::Success, message);
    }

    /// Log skipped work.
    pub fn log_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(job_id = self.id, job = %self.name, "{message}");
        self.push_log(LogLevel::Warning, message);
    }

    /// Log a failure.
    pub fn log_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(job_id = self.id, job = %self.name, "{message}");
        self.push_log(LogLevel::Failure, message);
    }

    /// Append a record operation row.
    pub fn add_output(&mut self, row: OutputRow) {
        self.data.output.push(row);
    }

    /// Due time of the next run of a recurring job: the previous due time
    /// (or the creation time, for a job that was never scheduled) plus the
    /// interval.
    #[must_use]
    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        let minutes = self.interval_minutes.filter(|m| *m > 0)?;
        let base = self.scheduled.unwrap_or(self.created);
        Some(base + Duration::minutes(i64::from(minutes)))
    }
}

/// Enqueue and cancel jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue a job and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be queued.
    async fn enqueue(&self, request: EnqueueRequest) -> Result<JobId, SyncError>;

    /// Cancel every job for `subject` named `name` that has not started yet.
    /// Returns the number of jobs cancelled.
    async fn cancel_scheduled(&self, subject: &JobSubject, name: &str) -> usize;
}

/// Runs the task a job names.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Execute `job`, recording progress and the outcome on it.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the task, after the job was marked errored.
    async fn execute(&self, job: &mut Job, queue: &dyn JobQueue) -> Result<(), SyncError>;
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod jobs_tests;
