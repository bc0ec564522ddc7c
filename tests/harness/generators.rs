// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use contact_gate::{SubmissionRequest, SubmitterIdentity};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of submitter identities (10.x.x.x addresses).
pub fn generate_identities(count: usize) -> Vec<SubmitterIdentity> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            SubmitterIdentity::new(IpAddr::V4(Ipv4Addr::new(10, a, b, c)).to_string())
        })
        .collect()
}

/// A submission a person would plausibly send. `seq` keeps messages distinct.
pub fn genuine_request(seq: usize) -> SubmissionRequest {
    SubmissionRequest {
        name: format!("Visitor {seq}"),
        email: format!("visitor{seq}@example.org"),
        phone: (seq % 2 == 0).then(|| "+44 20 7946 0958".to_string()),
        subject: "Booking enquiry".to_string(),
        message: format!("Hello, is the hall free for event number {seq} next month?"),
        honeypot: None,
        form_load_timestamp: Some(1_000),
        submission_timestamp: Some(45_000),
    }
}

/// Honeypot filled in.
pub fn honeypot_bot(seq: usize) -> SubmissionRequest {
    SubmissionRequest {
        honeypot: Some(format!("https://links-{seq}.example.net")),
        ..genuine_request(seq)
    }
}

/// Submitted 200ms after the form loaded.
pub fn fast_fill_bot(seq: usize) -> SubmissionRequest {
    SubmissionRequest {
        form_load_timestamp: Some(5_000),
        submission_timestamp: Some(5_200),
        ..genuine_request(seq)
    }
}

/// Name field echoes the email field.
pub fn echo_bot(seq: usize) -> SubmissionRequest {
    let req = genuine_request(seq);
    SubmissionRequest {
        name: req.email.clone(),
        ..req
    }
}

/// Message carries a spam keyword in mixed case.
pub fn spam_bot(seq: usize) -> SubmissionRequest {
    SubmissionRequest {
        message: format!("You are today's LUCKY Winner, claim reward {seq} now!"),
        ..genuine_request(seq)
    }
}

/// Structurally invalid submission.
pub fn invalid_request(seq: usize) -> SubmissionRequest {
    SubmissionRequest {
        name: "X".to_string(),
        email: format!("not-an-email-{seq}"),
        message: "hey".to_string(),
        ..genuine_request(seq)
    }
}

/// Markup and script payloads that must not survive sanitization.
pub fn generate_markup_payloads() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "<SCRIPT SRC=//evil.example/x.js></SCRIPT>",
        "<img src=x onerror=alert(1)>",
        "<svg/onload=alert(1)>",
        "<a href=\"javascript:alert(1)\">click</a>",
        "<iframe src=\"https://evil.example\"></iframe>",
        "<<script>>alert(1)<</script>>",
        "<style>body{display:none}</style>",
        "<!-- hidden --><b>bold</b>",
        "<div\nonclick=alert(1)>multi\nline</div>",
        "unclosed <img src=x onerror=alert(1)",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_identities() {
        let ids = generate_identities(256);
        assert_eq!(ids.len(), 256);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_genuine_requests_are_distinct() {
        assert_ne!(genuine_request(1).message, genuine_request(2).message);
        assert_ne!(genuine_request(1).email, genuine_request(2).email);
    }
}
