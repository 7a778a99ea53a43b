// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Barnacle Common Library
//!
//! Shared definitions for the Barnacle measured-boot suite:
//!
//! - Unified [`Error`] type with stable error codes
//! - In-RAM circular [`log::LogBuffer`] (the boot debug channel)
//! - Shared wire types (agent versions, certificate table entries)
//! - System-wide constants (region magic, KDF labels, digest sizes)
//!
//! # Security
//!
//! Nothing in this crate allocates. Key material never passes through the
//! log buffer; callers log error codes and public metadata only.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

pub mod constants;
pub mod errors;
pub mod log;
pub mod types;

pub use errors::{Error, Result};
pub use types::{AgentVersion, CertTableEntry, IssueTime};
