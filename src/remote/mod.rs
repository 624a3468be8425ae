//! Remote Module - Client for an analytic SQL engine reachable only through
//! asynchronous job submission
//!
//! - [`SqlTransport`] is the raw request/response seam ([`HttpTransport`] in production)
//! - [`JobClient`] adds authentication, submission and bounded polling
//! - [`Session`] carries the token for one run and is never cached across runs

pub mod client;
pub mod transport;

pub use client::{JobClient, JobId, JobOutcome, PollPolicy, RemoteJobState};
pub use transport::{HttpTransport, JobStatus, SqlTransport, SubmitResponse};

use std::fmt;

/// Login credentials for the engine
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Authenticated session for one run. Read-only once created.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"***").finish()
    }
}
