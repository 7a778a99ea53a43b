// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Barnacle Boot Core
//!
//! The boot-time security state machine of the Barnacle loader:
//!
//! - **Provision**: one-time device identity creation and self-signed
//!   device certificate issuance
//! - **Verify**: per-boot agent measurement, optional author-signature
//!   enforcement, rollback detection, compound key derivation, and alias
//!   certificate issuance
//! - **Assemble**: RAM certificate store and compound identity hand-off
//! - **Seal**: firewall activation over the private flash regions before
//!   control reaches the agent
//!
//! The flash layout is explicit configuration ([`layout::RegionLayout`]);
//! the linker script owns only physical placement. All hardware access
//! goes through the `bnc-hal` traits, so the whole flow runs unchanged
//! against the mock devices on the host.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

pub mod boot;
pub mod certstore;
pub mod dfu;
pub mod gate;
pub mod header;
pub mod layout;
pub mod provision;
pub mod regions;
pub mod store;
pub mod verify;

pub use boot::{Boot, BootArtifacts, BootConfig, RollbackPolicy};
pub use certstore::{CertStore, CertStoreSlot, CompoundId};
pub use header::AgentHeader;
pub use layout::{Region, RegionLayout};
pub use store::PersistentStore;
