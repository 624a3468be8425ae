//! In-memory engine used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lakeload::error::{LoadError, Result};
use lakeload::remote::{Credentials, JobStatus, Session, SqlTransport, SubmitResponse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What the engine does with statements containing a given fragment
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Job ends FAILED with this message
    Fail(String),
    /// Submission is refused outright
    Reject(String),
    /// Job stays RUNNING forever
    Hang,
}

/// Records every submitted statement. Jobs complete on the first poll
/// unless a rule says otherwise.
#[derive(Default)]
pub struct FakeEngine {
    pub reject_login: bool,
    rules: Vec<(String, Behavior)>,
    submitted: Mutex<Vec<String>>,
    jobs: Mutex<HashMap<String, JobStatus>>,
    pub logins: AtomicUsize,
    pub polls: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_login() -> Self {
        Self {
            reject_login: true,
            ..Self::default()
        }
    }

    pub fn with_rule(mut self, fragment: &str, behavior: Behavior) -> Self {
        self.rules.push((fragment.to_string(), behavior));
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_starting_with(&self, prefix: &str) -> Vec<String> {
        self.submitted()
            .into_iter()
            .filter(|sql| sql.starts_with(prefix))
            .collect()
    }

    fn behavior_for(&self, sql: &str) -> Option<&Behavior> {
        self.rules
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, behavior)| behavior)
    }
}

#[async_trait]
impl SqlTransport for FakeEngine {
    async fn login(&self, credentials: &Credentials) -> Result<String> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.reject_login {
            return Err(LoadError::Authentication(format!(
                "bad credentials for {}",
                credentials.user
            )));
        }
        Ok("fake-token".to_string())
    }

    async fn submit_sql(&self, session: &Session, sql: &str) -> Result<SubmitResponse> {
        assert_eq!(session.token(), "fake-token");

        let status = match self.behavior_for(sql) {
            Some(Behavior::Reject(msg)) => return Err(LoadError::Submission(msg.clone())),
            Some(Behavior::Fail(msg)) => JobStatus {
                error_message: Some(msg.clone()),
                ..JobStatus::new("FAILED")
            },
            Some(Behavior::Hang) => JobStatus::new("RUNNING"),
            None => JobStatus::new("COMPLETED"),
        };

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(sql.to_string());
        let id = format!("job-{}", submitted.len());
        self.jobs.lock().unwrap().insert(id.clone(), status);
        Ok(SubmitResponse { id: Some(id) })
    }

    async fn job_status(&self, _session: &Session, job_id: &str) -> Result<JobStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| LoadError::Transport(format!("unknown job {}", job_id)))
    }
}
