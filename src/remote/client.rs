//! Job Client - Submits statements and waits for their jobs to finish
//!
//! The engine never pushes completion, so [`JobClient::await_completion`]
//! polls: it sleeps one interval before every status call and gives up
//! after a fixed number of polls. A submission is never retried.

use crate::error::{LoadError, Result};
use crate::remote::transport::SqlTransport;
use crate::remote::{Credentials, Session};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Opaque identifier of a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long to wait for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest a single wait can take, saturating at `Duration::MAX`
    pub fn upper_bound(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 60)
    }
}

/// Terminal result of waiting on one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { row_count: Option<u64> },
    Failed { reason: String },
    TimedOut { attempts: u32 },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Completed { row_count: Some(n) } => write!(f, "completed ({} rows)", n),
            JobOutcome::Completed { row_count: None } => write!(f, "completed"),
            JobOutcome::Failed { reason } => write!(f, "failed: {}", reason),
            JobOutcome::TimedOut { attempts } => {
                write!(f, "timeout after {} polls", attempts)
            }
        }
    }
}

/// Job states reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobState {
    Completed,
    Failed,
    Canceled,
    /// Anything non-terminal (queued, planning, running, unknown)
    Pending(String),
}

impl RemoteJobState {
    pub fn parse(state: &str) -> Self {
        match state.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => RemoteJobState::Completed,
            "FAILED" => RemoteJobState::Failed,
            "CANCELED" | "CANCELLED" => RemoteJobState::Canceled,
            other => RemoteJobState::Pending(other.to_string()),
        }
    }
}

/// Submission and polling on top of a transport
pub struct JobClient<T> {
    transport: T,
}

impl<T: SqlTransport> JobClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Log in once; the returned session is used for the whole run
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let token = self.transport.login(credentials).await.map_err(|e| match e {
            LoadError::Authentication(msg) => LoadError::Authentication(msg),
            other => LoadError::Authentication(other.to_string()),
        })?;
        info!("Authenticated as {}", credentials.user);
        Ok(Session::new(token))
    }

    /// Submit a statement without waiting for it
    pub async fn submit(&self, session: &Session, sql: &str) -> Result<JobId> {
        let response = self.transport.submit_sql(session, sql).await.map_err(|e| match e {
            LoadError::Submission(msg) => LoadError::Submission(msg),
            other => LoadError::Submission(other.to_string()),
        })?;

        match response.id {
            Some(id) if !id.trim().is_empty() => Ok(JobId(id)),
            _ => Err(LoadError::Submission(
                "Engine accepted the statement without a job id".to_string(),
            )),
        }
    }

    /// Poll a job until it reaches a terminal state or the policy runs out.
    /// Status calls that fail count as a poll and are not fatal.
    pub async fn await_completion(
        &self,
        session: &Session,
        job_id: &JobId,
        policy: &PollPolicy,
    ) -> JobOutcome {
        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;

            let status = match self.transport.job_status(session, job_id.as_str()).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        "Polling job {} failed (attempt {}/{}): {}",
                        job_id, attempt, policy.max_attempts, e
                    );
                    continue;
                }
            };

            match RemoteJobState::parse(&status.job_state) {
                RemoteJobState::Completed => {
                    return JobOutcome::Completed {
                        row_count: status.row_count,
                    }
                }
                RemoteJobState::Failed => {
                    return JobOutcome::Failed {
                        reason: status
                            .error_message
                            .unwrap_or_else(|| "Unknown error".to_string()),
                    }
                }
                RemoteJobState::Canceled => {
                    return JobOutcome::Failed {
                        reason: status
                            .error_message
                            .unwrap_or_else(|| "job canceled".to_string()),
                    }
                }
                RemoteJobState::Pending(state) => {
                    debug!("Job {} is {} (attempt {})", job_id, state, attempt);
                }
            }
        }

        JobOutcome::TimedOut {
            attempts: policy.max_attempts,
        }
    }

    /// Submit and wait. Only a failed submission is an error.
    pub async fn execute(
        &self,
        session: &Session,
        sql: &str,
        policy: &PollPolicy,
    ) -> Result<JobOutcome> {
        let job_id = self.submit(session, sql).await?;
        debug!("Submitted job {}", job_id);
        Ok(self.await_completion(session, &job_id, policy).await)
    }
}
