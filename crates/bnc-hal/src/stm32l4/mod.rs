// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! STM32L4 drivers
//!
//! Register-level drivers for the peripherals the boot core needs on
//! STM32L4: flash program/erase, the true RNG, the bus firewall, and the
//! RCC reset-cause flags. MMIO sequences are compiled for ARM targets
//! only; host builds keep the same control flow with the hardware
//! accesses elided.

pub mod firewall;
pub mod flash;
pub mod registers;
pub mod reset;
pub mod rng;

pub use firewall::Stm32l4Firewall;
pub use flash::Stm32l4Flash;
pub use reset::Stm32l4Reset;
pub use rng::Stm32l4Rng;
