// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the contact submission gate.

use thiserror::Error;

/// Gate error types.
///
/// These never reach the submitter directly; the pipeline folds them into a
/// [`crate::pipeline::SubmitResult`] with a generic message.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pattern for {name}: {reason}")]
    InvalidPattern { name: &'static str, reason: String },

    #[error("Rate limit store error: {0}")]
    Store(String),

    #[error("Sink transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GateError>;
