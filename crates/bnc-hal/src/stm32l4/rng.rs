// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! STM32L4 true random number generator driver
//!
//! The hardware RNG produces 32-bit words gated by a data-ready flag.
//! Seed and clock error flags abort the boot rather than degrade to
//! weaker entropy.

use crate::error::{HalError, HalResult};
use crate::traits::RngInterface;

#[cfg(target_arch = "arm")]
mod regs {
    /// RNG register base
    pub const RNG_BASE: u32 = 0x5006_0800;
    /// Control register
    pub const RNG_CR: u32 = RNG_BASE + 0x00;
    /// Status register
    pub const RNG_SR: u32 = RNG_BASE + 0x04;
    /// Data register
    pub const RNG_DR: u32 = RNG_BASE + 0x08;

    /// RNG enable
    pub const CR_RNGEN: u32 = 1 << 2;
    /// Data ready
    pub const SR_DRDY: u32 = 1 << 0;
    /// Clock error current status
    pub const SR_CECS: u32 = 1 << 1;
    /// Seed error current status
    pub const SR_SECS: u32 = 1 << 2;

    /// Spin budget for data-ready waits
    pub const MAX_WAIT: u32 = 1_000_000;
}

/// STM32L4 RNG driver
pub struct Stm32l4Rng {
    initialized: bool,
    #[cfg(not(target_arch = "arm"))]
    host_state: u64,
}

impl Stm32l4Rng {
    /// Create a new RNG driver instance
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initialized: false,
            #[cfg(not(target_arch = "arm"))]
            host_state: 0x5DEE_CE66_A7D1_C0DE,
        }
    }

    #[cfg(target_arch = "arm")]
    fn next_word(&self) -> HalResult<u32> {
        use super::registers::read_reg;

        let mut wait = 0;
        // SAFETY: RNG_SR/RNG_DR are valid STM32L4 RNG registers. DR is
        // read only after DRDY; SECS/CECS are checked every iteration.
        unsafe {
            loop {
                let sr = read_reg(regs::RNG_SR);
                if sr & (regs::SR_SECS | regs::SR_CECS) != 0 {
                    return Err(HalError::RngFault);
                }
                if sr & regs::SR_DRDY != 0 {
                    return Ok(read_reg(regs::RNG_DR));
                }
                wait += 1;
                if wait > regs::MAX_WAIT {
                    return Err(HalError::RngNotReady);
                }
                core::hint::spin_loop();
            }
        }
    }

    #[cfg(not(target_arch = "arm"))]
    fn next_word(&mut self) -> HalResult<u32> {
        // Host stand-in: xorshift, deterministic per process.
        self.host_state ^= self.host_state << 13;
        self.host_state ^= self.host_state >> 7;
        self.host_state ^= self.host_state << 17;
        Ok(self.host_state as u32)
    }
}

impl RngInterface for Stm32l4Rng {
    fn init(&mut self) -> HalResult<()> {
        #[cfg(target_arch = "arm")]
        {
            use super::registers::modify_reg;
            // SAFETY: RNG_CR is a valid register; setting RNGEN starts
            // the generator.
            unsafe {
                modify_reg(regs::RNG_CR, |cr| cr | regs::CR_RNGEN);
            }
        }
        self.initialized = true;
        Ok(())
    }

    fn fill_bytes(&mut self, buffer: &mut [u8]) -> HalResult<()> {
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }

        for chunk in buffer.chunks_mut(4) {
            let word = self.next_word()?.to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }
}

impl Default for Stm32l4Rng {
    fn default() -> Self {
        Self::new()
    }
}
