// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! MMIO register access helpers

/// Read a 32-bit MMIO register
///
/// # Safety
///
/// `addr` must be a valid, mapped MMIO register address for the target.
#[cfg(target_arch = "arm")]
#[inline]
pub unsafe fn read_reg(addr: u32) -> u32 {
    core::ptr::read_volatile(addr as *const u32)
}

/// Write a 32-bit MMIO register
///
/// # Safety
///
/// `addr` must be a valid, mapped MMIO register address for the target.
#[cfg(target_arch = "arm")]
#[inline]
pub unsafe fn write_reg(addr: u32, value: u32) {
    core::ptr::write_volatile(addr as *mut u32, value);
}

/// Read-modify-write a 32-bit MMIO register
///
/// # Safety
///
/// `addr` must be a valid, mapped MMIO register address for the target.
#[cfg(target_arch = "arm")]
#[inline]
pub unsafe fn modify_reg(addr: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)));
}
