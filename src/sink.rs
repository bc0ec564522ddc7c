// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persistence collaborator for accepted submissions.
//!
//! Two implementations:
//! - [`MemorySink`]: in-process table, used when no backend is configured
//! - [`RestSink`]: row insert against a hosted backend's REST interface
//!
//! Backend failures carry their SQLSTATE code so the pipeline can map them
//! to a coarse [`ErrorKind`] without exposing the backend message.

use crate::config::SinkConfig;
use crate::error::{GateError, Result};
use crate::pipeline::ErrorKind;
use crate::submission::{ContactRecord, NewContactRow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Failure reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("persistence failed (code {code:?}, status {status:?}): {message}")]
pub struct PersistenceError {
    /// SQLSTATE or backend error code
    pub code: Option<String>,
    /// HTTP status, when the backend is remote
    pub status: Option<u16>,
    /// Raw backend message; logged, never returned to submitters
    pub message: String,
}

impl PersistenceError {
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            status: None,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    /// Coarse category for the submitter.
    pub fn kind(&self) -> ErrorKind {
        match self.code.as_deref() {
            Some(UNIQUE_VIOLATION) => ErrorKind::DuplicateSubmission,
            Some(code) if code.starts_with("22") => ErrorKind::InvalidDataFormat,
            Some(code) if code.starts_with("23") => ErrorKind::ConstraintViolation,
            // 28xxx: invalid authorization; 42501: insufficient privilege (row-level security)
            Some(code) if code.starts_with("28") || code == "42501" => {
                ErrorKind::AuthorizationError
            }
            _ => match self.status {
                Some(401) | Some(403) => ErrorKind::AuthorizationError,
                _ => ErrorKind::UnknownError,
            },
        }
    }
}

/// Row-insert collaborator.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn insert(&self, row: NewContactRow) -> std::result::Result<ContactRecord, PersistenceError>;
}

/// In-process contact table.
///
/// Enforces the same uniqueness the hosted table does: one row per
/// (email, subject, message).
#[derive(Default)]
pub struct MemorySink {
    rows: RwLock<Vec<ContactRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ContactRecord> {
        self.rows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl SubmissionSink for MemorySink {
    async fn insert(&self, row: NewContactRow) -> std::result::Result<ContactRecord, PersistenceError> {
        let mut rows = self.rows.write().await;

        let s = &row.submission;
        let duplicate = rows
            .iter()
            .any(|r| r.email == s.email && r.subject == s.subject && r.message == s.message);
        if duplicate {
            return Err(PersistenceError::with_code(
                UNIQUE_VIOLATION,
                "duplicate key value violates unique constraint \"contact_submissions_unique\"",
            ));
        }

        let record = ContactRecord::from_row(Uuid::new_v4().to_string(), Utc::now(), row);
        debug!(id = %record.id, "Contact submission stored in memory");
        rows.push(record.clone());
        Ok(record)
    }
}

/// Error body returned by the hosted backend's REST layer.
#[derive(Debug, Default, Deserialize)]
struct BackendError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Inserts rows through a PostgREST-style endpoint:
/// `POST {url}/rest/v1/{table}`.
pub struct RestSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RestSink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let base = config
            .url
            .as_deref()
            .ok_or_else(|| GateError::InvalidConfig("sink url is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base.trim_end_matches('/'), config.table),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionSink for RestSink {
    async fn insert(&self, row: NewContactRow) -> std::result::Result<ContactRecord, PersistenceError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&[row]);

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PersistenceError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: BackendError = response.json().await.unwrap_or_default();
            return Err(PersistenceError {
                code: body.code,
                status: Some(status.as_u16()),
                message: body
                    .message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        let mut rows: Vec<ContactRecord> = response
            .json()
            .await
            .map_err(|e| PersistenceError::transport(format!("unreadable insert response: {e}")))?;

        rows.pop()
            .ok_or_else(|| PersistenceError::transport("insert returned no rows"))
    }
}
