// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! STM32L4 flash driver
//!
//! Page erase and double-word programming per the STM32L4 reference
//! manual. Pages are 2 KB; the program unit is a 64-bit double word.

use crate::error::{HalError, HalResult};
use crate::traits::FlashInterface;

/// Flash page size (2 KB on STM32L4)
pub const PAGE_SIZE: usize = 2048;

/// Program unit: 64-bit double word
pub const WRITE_GRANULE: usize = 8;

/// Flash base address
pub const FLASH_BASE: u32 = 0x0800_0000;

/// Total flash size (1 MB)
pub const TOTAL_SIZE: usize = 1024 * 1024;

#[cfg(target_arch = "arm")]
mod regs {
    /// Flash controller register base
    pub const FLASH_R_BASE: u32 = 0x4002_2000;
    /// Key register
    pub const FLASH_KEYR: u32 = FLASH_R_BASE + 0x08;
    /// Status register
    pub const FLASH_SR: u32 = FLASH_R_BASE + 0x10;
    /// Control register
    pub const FLASH_CR: u32 = FLASH_R_BASE + 0x14;

    /// Unlock key 1
    pub const KEY1: u32 = 0x4567_0123;
    /// Unlock key 2
    pub const KEY2: u32 = 0xCDEF_89AB;

    /// Programming enable
    pub const CR_PG: u32 = 1 << 0;
    /// Page erase
    pub const CR_PER: u32 = 1 << 1;
    /// Erase start
    pub const CR_STRT: u32 = 1 << 16;
    /// Page number field offset (bits 3..11)
    pub const CR_PNB_SHIFT: u32 = 3;
    /// Lock bit
    pub const CR_LOCK: u32 = 1 << 31;

    /// Busy flag
    pub const SR_BSY: u32 = 1 << 16;
    /// End of operation
    pub const SR_EOP: u32 = 1 << 0;
    /// Programming error summary: OPERR|PROGERR|WRPERR|PGAERR|SIZERR|PGSERR
    pub const SR_ERRORS: u32 = (1 << 1) | (1 << 3) | (1 << 4) | (1 << 5) | (1 << 6) | (1 << 7);

    /// Spin budget for BSY waits
    pub const MAX_WAIT: u32 = 1_000_000;
}

/// STM32L4 flash driver
pub struct Stm32l4Flash {
    initialized: bool,
}

impl Stm32l4Flash {
    /// Create a new flash driver instance
    #[must_use]
    pub const fn new() -> Self {
        Self { initialized: false }
    }

    fn check_bounds(address: u32, len: usize) -> HalResult<()> {
        let end = address
            .checked_add(len as u32)
            .ok_or(HalError::OutOfBounds)?;
        if address < FLASH_BASE || end > FLASH_BASE + TOTAL_SIZE as u32 {
            return Err(HalError::OutOfBounds);
        }
        Ok(())
    }

    #[cfg(target_arch = "arm")]
    fn wait_not_busy() -> HalResult<()> {
        use super::registers::read_reg;
        let mut wait = 0;
        // SAFETY: FLASH_SR is a valid STM32L4 flash controller register.
        while unsafe { read_reg(regs::FLASH_SR) } & regs::SR_BSY != 0 {
            wait += 1;
            if wait > regs::MAX_WAIT {
                return Err(HalError::Timeout);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }

    #[cfg(target_arch = "arm")]
    fn unlock() -> HalResult<()> {
        use super::registers::{read_reg, write_reg};
        // SAFETY: STM32L4 flash unlock sequence: two key writes to
        // FLASH_KEYR while locked. All registers are valid MMIO.
        unsafe {
            if read_reg(regs::FLASH_CR) & regs::CR_LOCK != 0 {
                write_reg(regs::FLASH_KEYR, regs::KEY1);
                write_reg(regs::FLASH_KEYR, regs::KEY2);
                if read_reg(regs::FLASH_CR) & regs::CR_LOCK != 0 {
                    return Err(HalError::Locked);
                }
            }
        }
        Ok(())
    }

    #[cfg(target_arch = "arm")]
    fn check_errors() -> HalResult<()> {
        use super::registers::{read_reg, write_reg};
        // SAFETY: FLASH_SR is a valid register; writing 1s clears the
        // sticky error flags.
        unsafe {
            let sr = read_reg(regs::FLASH_SR);
            if sr & regs::SR_ERRORS != 0 {
                write_reg(regs::FLASH_SR, regs::SR_ERRORS);
                return Err(HalError::ProgramFailed);
            }
        }
        Ok(())
    }
}

impl FlashInterface for Stm32l4Flash {
    const PAGE_SIZE: usize = PAGE_SIZE;
    const WRITE_GRANULE: usize = WRITE_GRANULE;
    const BASE_ADDRESS: u32 = FLASH_BASE;
    const TOTAL_SIZE: usize = TOTAL_SIZE;

    fn init(&mut self) -> HalResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()> {
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }
        Self::check_bounds(address, buffer.len())?;

        #[cfg(target_arch = "arm")]
        {
            // SAFETY: the range was bounds-checked against the
            // memory-mapped flash region, which is always readable.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    address as *const u8,
                    buffer.as_mut_ptr(),
                    buffer.len(),
                );
            }
        }
        #[cfg(not(target_arch = "arm"))]
        buffer.fill(0xFF);

        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> HalResult<()> {
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }
        Self::check_bounds(address, data.len())?;
        if address as usize % WRITE_GRANULE != 0 {
            return Err(HalError::Alignment);
        }

        #[cfg(target_arch = "arm")]
        {
            use super::registers::{modify_reg, write_reg};

            Self::unlock()?;
            Self::wait_not_busy()?;

            // SAFETY: flash programming sequence per the reference
            // manual: set PG, write each double word as two word
            // accesses, wait for BSY, then clear EOP and PG. The
            // destination range is bounds-checked and granule-aligned.
            unsafe {
                modify_reg(regs::FLASH_CR, |cr| cr | regs::CR_PG);

                let mut offset = 0usize;
                while offset < data.len() {
                    let mut dword = [0xFFu8; WRITE_GRANULE];
                    let chunk = (data.len() - offset).min(WRITE_GRANULE);
                    dword[..chunk].copy_from_slice(&data[offset..offset + chunk]);

                    let dest = (address as usize + offset) as *mut u32;
                    core::ptr::write_volatile(
                        dest,
                        u32::from_le_bytes([dword[0], dword[1], dword[2], dword[3]]),
                    );
                    core::ptr::write_volatile(
                        dest.add(1),
                        u32::from_le_bytes([dword[4], dword[5], dword[6], dword[7]]),
                    );

                    Self::wait_not_busy()?;
                    Self::check_errors()?;
                    offset += WRITE_GRANULE;
                }

                write_reg(regs::FLASH_SR, regs::SR_EOP);
                modify_reg(regs::FLASH_CR, |cr| cr & !regs::CR_PG);
            }
        }

        Ok(())
    }

    fn erase_page(&mut self, address: u32) -> HalResult<()> {
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }
        Self::check_bounds(address, 1)?;

        #[cfg(target_arch = "arm")]
        {
            use super::registers::{modify_reg, read_reg, write_reg};

            Self::unlock()?;
            Self::wait_not_busy()?;

            let page = (address - FLASH_BASE) / PAGE_SIZE as u32;

            // SAFETY: page erase sequence per the reference manual: set
            // PER and the page number, set STRT, wait, then clear. The
            // page index is derived from a bounds-checked address.
            unsafe {
                let cr = read_reg(regs::FLASH_CR);
                let cr = (cr & !(0xFF << regs::CR_PNB_SHIFT))
                    | regs::CR_PER
                    | ((page & 0xFF) << regs::CR_PNB_SHIFT);
                write_reg(regs::FLASH_CR, cr);
                write_reg(regs::FLASH_CR, cr | regs::CR_STRT);

                Self::wait_not_busy()?;
                write_reg(regs::FLASH_SR, regs::SR_EOP);
                modify_reg(regs::FLASH_CR, |cr| cr & !regs::CR_PER);
            }

            Self::check_errors().map_err(|_| HalError::EraseFailed)?;
        }

        Ok(())
    }
}

impl Default for Stm32l4Flash {
    fn default() -> Self {
        Self::new()
    }
}
