// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission data model: the raw request, the submitter identity, and the
//! sanitized shapes that cross into persistence.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Unvalidated contact form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    /// Field hidden from humans; real users leave it empty.
    #[serde(default, alias = "website")]
    pub honeypot: Option<String>,
    /// Epoch milliseconds when the form was rendered.
    #[serde(default)]
    pub form_load_timestamp: Option<i64>,
    /// Epoch milliseconds when the form was submitted.
    #[serde(default)]
    pub submission_timestamp: Option<i64>,
}

/// Rate-limit partition key for a submission origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmitterIdentity(String);

impl SubmitterIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key a submission by its peer address.
    ///
    /// `X-Forwarded-For` is only read when the peer is one of
    /// `trusted_proxies`; the client is then the right-most hop that is not
    /// itself a trusted proxy. Without a peer address the normalized email
    /// is used.
    pub fn derive(
        forwarded_for: Option<&str>,
        peer: Option<IpAddr>,
        trusted_proxies: &[IpAddr],
        email: &str,
    ) -> Self {
        let Some(peer) = peer else {
            return Self(email.trim().to_lowercase());
        };

        if !trusted_proxies.contains(&peer) {
            return Self(peer.to_string());
        }

        let mut hops = forwarded_for
            .unwrap_or_default()
            .rsplit(',')
            .map_while(|hop| hop.trim().parse::<IpAddr>().ok());

        // Every hop trusted: the left-most one is the client
        let mut leftmost = None;
        let client = hops
            .find(|hop| {
                leftmost = Some(*hop);
                !trusted_proxies.contains(hop)
            })
            .or(leftmost)
            .unwrap_or(peer);
        Self(client.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmitterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-safe submission, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedSubmission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

impl From<&SanitizedSubmission> for SubmissionRequest {
    fn from(submission: &SanitizedSubmission) -> Self {
        Self {
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            subject: submission.subject.clone(),
            message: submission.message.clone(),
            ..Default::default()
        }
    }
}

/// Row handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewContactRow {
    #[serde(flatten)]
    pub submission: SanitizedSubmission,
    pub ip_address: String,
}

/// Row as stored by the collaborator, with server-assigned columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub ip_address: String,
}

impl ContactRecord {
    pub fn from_row(id: String, created_at: DateTime<Utc>, row: NewContactRow) -> Self {
        let NewContactRow {
            submission,
            ip_address,
        } = row;
        Self {
            id,
            created_at,
            name: submission.name,
            email: submission.email,
            phone: submission.phone,
            subject: submission.subject,
            message: submission.message,
            ip_address,
        }
    }
}

/// Hosted tables use either uuid or bigint primary keys.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("unexpected id value: {other}"))),
    }
}
