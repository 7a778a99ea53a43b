// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! STM32L4 bus firewall driver
//!
//! The firewall guards up to three segments (code, non-volatile data,
//! volatile data). Once enabled it stays armed until the next reset; an
//! access to a protected segment from outside the configured code
//! segment triggers a firewall reset. Segment addresses and lengths
//! carry a 256-byte granularity.

use crate::error::{HalError, HalResult};
use crate::traits::{FirewallConfig, FirewallInterface};

/// Firewall segment granularity in bytes
pub const SEGMENT_GRANULE: u32 = 256;

#[cfg(target_arch = "arm")]
mod regs {
    /// Firewall register base
    pub const FW_BASE: u32 = 0x4001_1C00;
    /// Code segment start address
    pub const FW_CSSA: u32 = FW_BASE + 0x00;
    /// Code segment length
    pub const FW_CSL: u32 = FW_BASE + 0x04;
    /// Non-volatile data segment start address
    pub const FW_NVDSSA: u32 = FW_BASE + 0x08;
    /// Non-volatile data segment length
    pub const FW_NVDSL: u32 = FW_BASE + 0x0C;
    /// Volatile data segment start address
    pub const FW_VDSSA: u32 = FW_BASE + 0x10;
    /// Volatile data segment length
    pub const FW_VDSL: u32 = FW_BASE + 0x14;

    /// SYSCFG register base
    pub const SYSCFG_BASE: u32 = 0x4001_0000;
    /// SYSCFG configuration register 1
    pub const SYSCFG_CFGR1: u32 = SYSCFG_BASE + 0x04;
    /// Firewall disable bit; cleared to arm the firewall
    pub const CFGR1_FWDIS: u32 = 1 << 0;

    /// RCC register base
    pub const RCC_BASE: u32 = 0x4002_1000;
    /// APB2 peripheral clock enable register
    pub const RCC_APB2ENR: u32 = RCC_BASE + 0x60;
    /// SYSCFG clock enable
    pub const APB2ENR_SYSCFGEN: u32 = 1 << 0;
}

/// STM32L4 firewall driver
pub struct Stm32l4Firewall {
    configured: bool,
    #[cfg(not(target_arch = "arm"))]
    enabled: bool,
}

impl Stm32l4Firewall {
    /// Create a new firewall driver instance
    #[must_use]
    pub const fn new() -> Self {
        Self {
            configured: false,
            #[cfg(not(target_arch = "arm"))]
            enabled: false,
        }
    }

    fn validate(config: &FirewallConfig) -> HalResult<()> {
        let fields = [
            config.code_start,
            config.code_len,
            config.nv_data_start,
            config.nv_data_len,
            config.volatile_data_start,
            config.volatile_data_len,
        ];
        if fields.iter().any(|&v| v % SEGMENT_GRANULE != 0) {
            return Err(HalError::FirewallConfig);
        }
        Ok(())
    }
}

impl FirewallInterface for Stm32l4Firewall {
    fn configure(&mut self, config: &FirewallConfig) -> HalResult<()> {
        if self.is_enabled() {
            return Err(HalError::FirewallConfig);
        }
        Self::validate(config)?;

        #[cfg(target_arch = "arm")]
        {
            use super::registers::{modify_reg, write_reg};

            // SAFETY: SYSCFG clock gate and firewall segment registers
            // are valid STM32L4 MMIO; the segment values were validated
            // against the 256-byte granularity above.
            unsafe {
                modify_reg(regs::RCC_APB2ENR, |v| v | regs::APB2ENR_SYSCFGEN);

                write_reg(regs::FW_CSSA, config.code_start);
                write_reg(regs::FW_CSL, config.code_len);
                write_reg(regs::FW_NVDSSA, config.nv_data_start);
                write_reg(regs::FW_NVDSL, config.nv_data_len);
                write_reg(regs::FW_VDSSA, config.volatile_data_start);
                write_reg(regs::FW_VDSL, config.volatile_data_len);
            }
        }

        self.configured = true;
        Ok(())
    }

    fn enable(&mut self) -> HalResult<()> {
        if !self.configured {
            return Err(HalError::FirewallConfig);
        }

        #[cfg(target_arch = "arm")]
        {
            use super::registers::modify_reg;
            // SAFETY: clearing FWDIS in SYSCFG_CFGR1 arms the firewall;
            // the bit cannot be set again until the next reset.
            unsafe {
                modify_reg(regs::SYSCFG_CFGR1, |v| v & !regs::CFGR1_FWDIS);
            }
        }
        #[cfg(not(target_arch = "arm"))]
        {
            self.enabled = true;
        }

        if !self.is_enabled() {
            return Err(HalError::FirewallNoEffect);
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        #[cfg(target_arch = "arm")]
        {
            use super::registers::read_reg;
            // SAFETY: SYSCFG_CFGR1 is a valid register; FWDIS clear
            // means the firewall is armed.
            unsafe { read_reg(regs::SYSCFG_CFGR1) & regs::CFGR1_FWDIS == 0 }
        }
        #[cfg(not(target_arch = "arm"))]
        {
            self.enabled
        }
    }
}

impl Default for Stm32l4Firewall {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned_segments_rejected() {
        let mut fw = Stm32l4Firewall::new();
        let config = FirewallConfig {
            nv_data_start: 0x0807_F001, // not 256-byte aligned
            nv_data_len: 0x800,
            ..FirewallConfig::default()
        };
        assert_eq!(fw.configure(&config), Err(HalError::FirewallConfig));
    }

    #[test]
    fn enable_requires_configure() {
        let mut fw = Stm32l4Firewall::new();
        assert_eq!(fw.enable(), Err(HalError::FirewallConfig));
    }

    #[test]
    fn enable_latches() {
        let mut fw = Stm32l4Firewall::new();
        let config = FirewallConfig {
            nv_data_start: 0x0807_F000,
            nv_data_len: 0x1000,
            ..FirewallConfig::default()
        };
        fw.configure(&config).unwrap();
        fw.enable().unwrap();
        assert!(fw.is_enabled());
        // Reconfiguration after enable is refused.
        assert_eq!(fw.configure(&config), Err(HalError::FirewallConfig));
    }
}
