//! Transport - Request/response calls against the engine's SQL REST API
//!
//! The engine exposes three calls:
//! - `POST {login_path}` with `{"userName", "password"}`, answering `{"token"}`
//! - `POST {api_path}/sql` with `{"sql"}`, answering `{"id"}`
//! - `GET {api_path}/job/{id}`, answering `{"jobState", "rowCount"?, "errorMessage"?}`
//!
//! Every call after login carries `Authorization: <scheme><token>`.

use crate::config::EngineConfig;
use crate::error::{LoadError, Result};
use crate::remote::{Credentials, Session};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Body returned by the SQL submission endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// Body returned by the job status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default = "unknown_state")]
    pub job_state: String,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

fn unknown_state() -> String {
    "UNKNOWN".to_string()
}

impl JobStatus {
    pub fn new(job_state: impl Into<String>) -> Self {
        Self {
            job_state: job_state.into(),
            row_count: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
}

/// Raw calls against the remote engine. Implementations do no polling
/// and no retrying; that belongs to [`crate::remote::JobClient`].
#[async_trait]
pub trait SqlTransport: Send + Sync {
    /// Exchange credentials for an opaque token
    async fn login(&self, credentials: &Credentials) -> Result<String>;

    /// Submit one statement
    async fn submit_sql(&self, session: &Session, sql: &str) -> Result<SubmitResponse>;

    /// Fetch the current state of a job
    async fn job_status(&self, session: &Session, job_id: &str) -> Result<JobStatus>;
}

/// HTTP transport built on reqwest
pub struct HttpTransport {
    client: Client,
    base_url: String,
    login_path: String,
    api_path: String,
    auth_scheme: String,
}

impl HttpTransport {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LoadError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            login_path: config.login_path.clone(),
            api_path: config.api_path.trim_end_matches('/').to_string(),
            auth_scheme: config.auth_scheme.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorization(&self, session: &Session) -> String {
        format!("{}{}", self.auth_scheme, session.token())
    }
}

#[async_trait]
impl SqlTransport for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let url = format!("{}{}", self.base_url, self.login_path);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                user_name: &credentials.user,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(|e| LoadError::Authentication(format!("Login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LoadError::Authentication(format!(
                "Login rejected with status {}: {}",
                status, text
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| LoadError::Authentication(format!("Failed to parse login response: {}", e)))?;

        body.token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LoadError::Authentication("Login response carried no token".to_string()))
    }

    async fn submit_sql(&self, session: &Session, sql: &str) -> Result<SubmitResponse> {
        let url = format!("{}{}/sql", self.base_url, self.api_path);
        debug!("POST {} ({} bytes of SQL)", url, sql.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.authorization(session))
            .json(&SqlRequest { sql })
            .send()
            .await
            .map_err(|e| LoadError::Submission(format!("Failed to submit statement: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LoadError::Submission(format!(
                "Submission failed with status {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LoadError::Submission(format!("Failed to parse submission response: {}", e)))
    }

    async fn job_status(&self, session: &Session, job_id: &str) -> Result<JobStatus> {
        let url = format!("{}{}/job/{}", self.base_url, self.api_path, job_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.authorization(session))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Transport(format!(
                "Job status request returned {}",
                status
            )));
        }

        Ok(response.json().await?)
    }
}
