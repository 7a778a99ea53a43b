// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! HAL error type

use bnc_common::Error;
use core::fmt;

/// Result type for HAL operations
pub type HalResult<T> = core::result::Result<T, HalError>;

/// Errors raised by hardware drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Driver used before `init`
    NotInitialized,
    /// Address or length outside the device
    OutOfBounds,
    /// Address or length violates alignment rules
    Alignment,
    /// Flash erase failed
    EraseFailed,
    /// Flash programming failed or verified mismatch
    ProgramFailed,
    /// Flash is locked against writes
    Locked,
    /// RNG produced no data within its startup window
    RngNotReady,
    /// RNG entered an error state (seed or clock error)
    RngFault,
    /// Firewall rejected the segment configuration
    FirewallConfig,
    /// Firewall enable did not latch
    FirewallNoEffect,
    /// Operation timed out
    Timeout,
    /// Invalid parameter
    InvalidParameter,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotInitialized => "driver not initialized",
            Self::OutOfBounds => "address out of bounds",
            Self::Alignment => "alignment violation",
            Self::EraseFailed => "erase failed",
            Self::ProgramFailed => "program failed",
            Self::Locked => "flash locked",
            Self::RngNotReady => "RNG not ready",
            Self::RngFault => "RNG fault",
            Self::FirewallConfig => "firewall config rejected",
            Self::FirewallNoEffect => "firewall enable had no effect",
            Self::Timeout => "timeout",
            Self::InvalidParameter => "invalid parameter",
        };
        f.write_str(msg)
    }
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::NotInitialized => Error::HardwareInitFailed,
            HalError::OutOfBounds => Error::FlashOutOfBounds,
            HalError::Alignment => Error::FlashAlignment,
            HalError::EraseFailed => Error::FlashEraseFailed,
            HalError::ProgramFailed | HalError::Locked => Error::FlashProgramFailed,
            HalError::RngNotReady => Error::RngNotReady,
            HalError::RngFault => Error::RngFailure,
            HalError::FirewallConfig => Error::FirewallConfigFailed,
            HalError::FirewallNoEffect => Error::FirewallEnableFailed,
            HalError::Timeout => Error::Timeout,
            HalError::InvalidParameter => Error::InvalidParameter,
        }
    }
}
