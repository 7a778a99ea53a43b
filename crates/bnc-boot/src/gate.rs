// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Security gate
//!
//! The last observable action before the agent runs: the bus firewall is
//! armed over both private flash regions (device identity and boot
//! cache) as a non-volatile data segment, with no code segment and no
//! volatile segment. From that point any agent access to the private
//! regions forces a firewall reset; the agent sees only the RAM
//! certificate store and whatever the loader hands off.

use bnc_common::log::LogBuffer;
use bnc_common::{log_error, log_info, Error};
use bnc_hal::{FirewallConfig, FirewallInterface, ResetInterface, ResetReason};

use crate::layout::RegionLayout;

const MODULE: &str = "gate";

/// Arm the firewall over the private regions
///
/// Fails when the firewall rejects the configuration or the enable does
/// not latch; the boot must not transfer control in that case.
pub fn seal<FW: FirewallInterface>(
    firewall: &mut FW,
    layout: &RegionLayout,
    log: &mut LogBuffer,
) -> Result<(), Error> {
    let (nv_start, nv_len) = layout.firewall_span();
    let config = FirewallConfig {
        code_start: 0,
        code_len: 0,
        nv_data_start: nv_start,
        nv_data_len: nv_len,
        volatile_data_start: 0,
        volatile_data_len: 0,
    };

    if let Err(e) = firewall.configure(&config) {
        let e = Error::from(e);
        log_error!(log, MODULE, "firewall config failed: {e}");
        return Err(e);
    }

    if let Err(e) = firewall.enable() {
        let e = Error::from(e);
        log_error!(log, MODULE, "firewall enable failed: {e}");
        return Err(e);
    }
    if !firewall.is_enabled() {
        log_error!(log, MODULE, "firewall enable had no effect");
        return Err(Error::FirewallEnableFailed);
    }

    log_info!(log, MODULE, "firewall is up");
    Ok(())
}

/// Whether the last reset was a firewall violation; clears the flag
///
/// Used for post-violation diagnostics before the flags are consumed by
/// anything else.
pub fn take_violation<R: ResetInterface>(reset: &mut R) -> bool {
    if reset.reset_reason() == ResetReason::Firewall {
        reset.clear_reset_flags();
        true
    } else {
        false
    }
}
