// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Barnacle Cryptographic Primitives
//!
//! The crypto layer consumed by the boot core:
//!
//! - **Hash**: SHA-256, one-shot and incremental
//! - **KDF**: HKDF-SHA256 one-shot derivation with context and label
//! - **ECC**: deterministic key derivation from a seed, ECDSA over
//!   prehashed digests, SEC1 public-key export
//! - **Hygiene**: zeroizing buffers and constant-time comparison
//!
//! The curve is fixed at build time through exactly one of the `p256`,
//! `p384`, or `p521` crate features. All key and signature types carry
//! fixed-size coordinate arrays so they can live inside flash region
//! images without further encoding.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

pub mod ecc;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod traits;
pub mod zeroize_utils;

pub use ecc::{EccPrivateKey, EccPublicKey, EccSignature, COORD_LEN};
pub use error::CryptoError;
pub use hash::Sha256;
pub use traits::constant_time_eq;
pub use zeroize_utils::{secure_zero, SecureBuffer};

#[cfg(not(any(feature = "p256", feature = "p384", feature = "p521")))]
compile_error!(
    "Barnacle requires exactly one ECC curve. \
     Enable one of the `p256`, `p384`, or `p521` features."
);

#[cfg(any(
    all(feature = "p256", feature = "p384"),
    all(feature = "p256", feature = "p521"),
    all(feature = "p384", feature = "p521"),
))]
compile_error!(
    "Barnacle supports a single ECC curve per build. \
     Enable only one of the `p256`, `p384`, or `p521` features."
);
