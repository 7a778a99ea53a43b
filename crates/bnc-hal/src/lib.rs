// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Barnacle Hardware Abstraction Layer
//!
//! Platform-agnostic traits for the peripherals the boot core touches
//! (flash, RNG, bus firewall, reset-cause register) plus the STM32L4
//! drivers behind them. The `mock` feature adds in-memory devices for
//! host testing, including scriptable flash fault injection.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

pub mod error;
pub mod traits;

pub mod stm32l4;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{HalError, HalResult};
pub use traits::{
    FirewallConfig, FirewallInterface, FlashInterface, ResetInterface, ResetReason,
    RngInterface,
};
