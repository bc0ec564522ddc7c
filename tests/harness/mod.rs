// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for contact gate abuse simulation.
//!
//! Drives the gate with scripted traffic on a manual clock so tier windows
//! can be crossed without sleeping.

pub mod attacks;
pub mod generators;
pub mod metrics;
