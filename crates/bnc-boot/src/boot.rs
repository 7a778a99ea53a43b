// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Top-level boot flow
//!
//! [`Boot`] owns the store, the hardware peripherals, and the debug log
//! for one power cycle. Its sole entry point is [`Boot::run`], which
//! executes *provision → verify agent → seal* strictly in order and
//! returns the RAM artifacts for the platform entry code to place and
//! hand off before jumping to the agent.
//!
//! On any failure no certificate store is exposed; transient private
//! key material zeroizes as it drops.

use bnc_common::log::LogBuffer;
use bnc_common::Error;
use bnc_hal::{FirewallInterface, FlashInterface, ResetInterface, RngInterface};

use crate::gate;
use crate::layout::RegionLayout;
use crate::provision::provision;
use crate::store::PersistentStore;
use crate::verify::AgentVerifier;

pub use crate::verify::{BootArtifacts, RollbackPolicy};

/// Boot configuration
#[derive(Debug, Clone, Copy)]
pub struct BootConfig {
    /// Flash region layout
    pub layout: RegionLayout,
    /// Rollback handling policy
    pub rollback_policy: RollbackPolicy,
}

impl BootConfig {
    /// Configuration with the default (report-only) rollback policy
    #[must_use]
    pub const fn new(layout: RegionLayout) -> Self {
        Self {
            layout,
            rollback_policy: RollbackPolicy::ReportOnly,
        }
    }
}

/// One boot cycle's worth of state
pub struct Boot<F: FlashInterface, R: RngInterface, W: FirewallInterface> {
    store: PersistentStore<F>,
    rng: R,
    firewall: W,
    rollback_policy: RollbackPolicy,
    log: LogBuffer,
}

impl<F: FlashInterface, R: RngInterface, W: FirewallInterface> Boot<F, R, W> {
    /// Assemble a boot instance; validates the layout
    pub fn new(config: BootConfig, flash: F, mut rng: R, firewall: W) -> Result<Self, Error> {
        let store = PersistentStore::new(flash, config.layout)?;
        rng.init().map_err(Error::from)?;

        Ok(Self {
            store,
            rng,
            firewall,
            rollback_policy: config.rollback_policy,
            log: LogBuffer::new(),
        })
    }

    /// The debug log accumulated so far
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// The persistent store (DFU descriptor construction, tooling)
    pub fn store(&self) -> &PersistentStore<F> {
        &self.store
    }

    /// Mutable store access (tests, fault injection)
    pub fn store_mut(&mut self) -> &mut PersistentStore<F> {
        &mut self.store
    }

    /// Run the boot security flow to completion
    ///
    /// Provision (first boot only), verify and attest the agent, then
    /// arm the firewall. Returns the RAM artifacts on success. The
    /// sequence is strictly serial; the firewall enable is the last
    /// observable action.
    pub fn run(&mut self) -> Result<BootArtifacts, Error> {
        provision(&mut self.store, &mut self.rng, &mut self.log)?;

        let verifier =
            AgentVerifier::new(&mut self.store, &mut self.log, self.rollback_policy);
        let artifacts = verifier.run()?;

        let layout = *self.store.layout();
        gate::seal(&mut self.firewall, &layout, &mut self.log)?;

        Ok(artifacts)
    }

    /// Whether the previous reset was a firewall violation
    ///
    /// Reads and clears the reset-cause flag through `reset`.
    pub fn firewall_violation<T: ResetInterface>(reset: &mut T) -> bool {
        gate::take_violation(reset)
    }

    /// Tear down into the underlying devices (tests, tooling)
    pub fn into_parts(self) -> (F, R, W) {
        (self.store.into_flash(), self.rng, self.firewall)
    }
}
