// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! STM32L4 reset-cause driver
//!
//! Reads the sticky reset flags in RCC_CSR. The firewall flag is how a
//! post-violation boot learns that the previous run tripped the gate.

use crate::error::HalResult;
use crate::traits::{ResetInterface, ResetReason};

#[cfg(target_arch = "arm")]
mod regs {
    /// RCC register base
    pub const RCC_BASE: u32 = 0x4002_1000;
    /// Control/status register with the reset flags
    pub const RCC_CSR: u32 = RCC_BASE + 0x94;

    /// Remove reset flags (write 1 to clear all)
    pub const CSR_RMVF: u32 = 1 << 23;
    /// Firewall reset flag
    pub const CSR_FWRSTF: u32 = 1 << 24;
    /// Brown-out reset flag
    pub const CSR_BORRSTF: u32 = 1 << 25;
    /// NRST pin reset flag
    pub const CSR_PINRSTF: u32 = 1 << 26;
    /// Software reset flag
    pub const CSR_SFTRSTF: u32 = 1 << 28;
    /// Independent watchdog reset flag
    pub const CSR_IWDGRSTF: u32 = 1 << 29;
    /// Window watchdog reset flag
    pub const CSR_WWDGRSTF: u32 = 1 << 30;
}

/// STM32L4 reset-cause driver
pub struct Stm32l4Reset {
    #[cfg(not(target_arch = "arm"))]
    host_reason: ResetReason,
}

impl Stm32l4Reset {
    /// Create a new reset-cause driver instance
    #[must_use]
    pub const fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "arm"))]
            host_reason: ResetReason::PowerOn,
        }
    }

    /// Probe the peripheral; kept for driver-construction symmetry
    pub fn init(&mut self) -> HalResult<()> {
        Ok(())
    }
}

impl ResetInterface for Stm32l4Reset {
    fn reset_reason(&self) -> ResetReason {
        #[cfg(target_arch = "arm")]
        {
            use super::registers::read_reg;
            // SAFETY: RCC_CSR is a valid, always-mapped register.
            let csr = unsafe { read_reg(regs::RCC_CSR) };

            // Priority order matters: the firewall flag is the one the
            // boot core acts on, and several flags can be set at once.
            if csr & regs::CSR_FWRSTF != 0 {
                ResetReason::Firewall
            } else if csr & (regs::CSR_IWDGRSTF | regs::CSR_WWDGRSTF) != 0 {
                ResetReason::Watchdog
            } else if csr & regs::CSR_SFTRSTF != 0 {
                ResetReason::Software
            } else if csr & regs::CSR_BORRSTF != 0 {
                ResetReason::BrownOut
            } else if csr & regs::CSR_PINRSTF != 0 {
                ResetReason::External
            } else {
                ResetReason::Unknown
            }
        }
        #[cfg(not(target_arch = "arm"))]
        {
            self.host_reason
        }
    }

    fn clear_reset_flags(&mut self) {
        #[cfg(target_arch = "arm")]
        {
            use super::registers::modify_reg;
            // SAFETY: setting RMVF clears all sticky reset flags.
            unsafe {
                modify_reg(regs::RCC_CSR, |v| v | regs::CSR_RMVF);
            }
        }
        #[cfg(not(target_arch = "arm"))]
        {
            self.host_reason = ResetReason::Unknown;
        }
    }
}

impl Default for Stm32l4Reset {
    fn default() -> Self {
        Self::new()
    }
}
